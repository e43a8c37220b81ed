//! CProject - writes a unit's instrumentation header.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::host::CHost;

/// Output location of one instrumented unit.
#[derive(Clone, Debug)]
pub struct CProject {
    /// Output directory.
    pub output_dir: PathBuf,
    /// Base name for generated files.
    pub base_name: String,
}

impl CProject {
    pub fn new(output_dir: impl AsRef<Path>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            base_name: base_name.into(),
        }
    }

    /// Project named after the stem of the unit's source file.
    pub fn for_unit(output_dir: impl AsRef<Path>, file: &str) -> Self {
        let stem = Path::new(file)
            .file_stem()
            .map_or_else(|| file.to_string(), |s| s.to_string_lossy().into_owned());
        Self::new(output_dir, stem)
    }

    /// Path to the instrumentation header.
    #[must_use]
    pub fn header_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_xcheck.h", self.base_name))
    }

    /// Render and write the header, creating the output directory.
    pub fn write_header(&self, host: &CHost<'_>) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.header_path();
        let header = host.render();
        trace!(path = %path.display(), bytes = header.len(), "writing header");
        fs::write(&path, header)?;
        debug!(path = %path.display(), "wrote instrumentation header");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcheck_config::ConfigStore;
    use xcheck_ir::{FunctionDecl, TranslationUnit};
    use xcheck_synth::{EngineOptions, instrument_unit};

    #[test]
    fn test_header_path_from_unit() {
        let project = CProject::for_unit("/tmp/out", "src/struct1.c");
        assert_eq!(project.base_name, "struct1");
        assert_eq!(project.header_path(), PathBuf::from("/tmp/out/struct1_xcheck.h"));
    }

    #[test]
    fn test_write_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut unit = TranslationUnit::new("empty.c");
        unit.functions
            .push(FunctionDecl::new("main", Vec::new(), None));
        let mut host = CHost::new(&unit);
        instrument_unit(&ConfigStore::default(), &unit, &mut host, &EngineOptions::default());

        let out = dir.path().join("nested");
        let path = CProject::for_unit(&out, &unit.file)
            .write_header(&host)
            .unwrap();
        assert_eq!(path, out.join("empty_xcheck.h"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("#define XCHECK_ENTRY_main() do {"));
        assert!(text.contains("#define XCHECK_EXIT_main(ret) do {"));
    }
}
