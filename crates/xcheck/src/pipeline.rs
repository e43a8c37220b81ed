//! High-level instrumentation pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use xcheck_config::{Config, ConfigStore, XCheck};
use xcheck_emit::{CHost, CProject};
use xcheck_ir::{FunctionDecl, TranslationUnit};
use xcheck_synth::{
    CheckRole, CheckSpecResolver, Diagnostic, EngineOptions, Severity, UnitSummary,
    instrument_unit,
};

use crate::error::{Error, Result};

/// Load and merge configuration files, in order.
pub fn load_config<P: AsRef<Path>>(paths: &[P]) -> Result<ConfigStore> {
    let mut config = Config::default();
    for path in paths {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        config.extend(Config::load(path)?);
    }
    Ok(ConfigStore::ingest(config)?)
}

/// The merged store as TOML. Loading the output yields the same store.
pub fn dump_store(store: &ConfigStore) -> Result<String> {
    Ok(store.to_config().to_toml_string()?)
}

/// Load a translation unit description.
pub fn load_unit(path: &Path) -> Result<TranslationUnit> {
    debug!(path = %path.display(), "loading unit");
    Ok(TranslationUnit::load(path)?)
}

/// Result of instrumenting one unit.
#[derive(Debug)]
pub struct Instrumented {
    /// Written header.
    pub header: PathBuf,
    pub summary: UnitSummary,
    pub diagnostics: Vec<Diagnostic>,
}

impl Instrumented {
    /// Whether any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Instrument `unit` and write its header into `output_dir`.
pub fn instrument(
    store: &ConfigStore,
    unit: &TranslationUnit,
    output_dir: impl AsRef<Path>,
    options: &EngineOptions,
) -> Result<Instrumented> {
    let mut host = CHost::new(unit);
    let summary = instrument_unit(store, unit, &mut host, options);
    for diagnostic in host.diagnostics() {
        match diagnostic.severity {
            Severity::Error => warn!(%diagnostic, "check dropped"),
            Severity::Warning => warn!(%diagnostic, "check degraded"),
        }
    }

    let header = CProject::for_unit(output_dir, &unit.file).write_header(&host)?;
    info!(header = %header.display(), checks = summary.checks, "wrote header");
    Ok(Instrumented {
        header,
        summary,
        diagnostics: host.diagnostics().to_vec(),
    })
}

/// A single check point of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckPoint {
    Entry,
    Exit,
    Return,
    Argument(String),
}

impl fmt::Display for CheckPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => f.write_str("entry"),
            Self::Exit => f.write_str("exit"),
            Self::Return => f.write_str("return"),
            Self::Argument(name) => write!(f, "argument `{name}`"),
        }
    }
}

/// Check that applies at `point` of `decl` in `file`.
///
/// A function configuration fragment that fails to parse is logged and
/// disables the function, as it does during instrumentation.
pub fn resolve(
    store: &ConfigStore,
    options: &EngineOptions,
    file: &str,
    decl: &FunctionDecl,
    point: &CheckPoint,
) -> Result<XCheck> {
    let resolver = CheckSpecResolver::new(store, options);
    let (policy, problem) = resolver.effective_function_config(file, decl);
    if let Some(err) = problem {
        warn!(function = %decl.name, error = %err, "ignoring function annotations");
    }

    let (role, annotations) = match point {
        CheckPoint::Entry => (CheckRole::Entry, &[][..]),
        CheckPoint::Exit => (CheckRole::Exit, &[][..]),
        CheckPoint::Return => (CheckRole::Return, &[][..]),
        CheckPoint::Argument(name) => {
            let annotations = decl
                .params
                .iter()
                .find(|p| p.name == *name)
                .map_or(&[][..], |p| p.annotations.as_slice());
            (CheckRole::Argument(name), annotations)
        }
    };
    Ok(resolver.resolve_function(&policy, role, annotations)?)
}

/// Declaration of `function`, from `unit` when one is given.
///
/// Without a unit the function is taken to have no parameters and no
/// annotations, so only file configuration applies.
pub fn function_decl(unit: Option<&TranslationUnit>, function: &str) -> Result<FunctionDecl> {
    match unit {
        Some(unit) => unit
            .function(function)
            .cloned()
            .ok_or_else(|| Error::UnknownFunction {
                file: unit.file.clone(),
                function: function.to_string(),
            }),
        None => Ok(FunctionDecl::new(function, Vec::new(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcheck_ir::{Type, VarDecl};

    fn store(text: &str) -> ConfigStore {
        ConfigStore::ingest(Config::from_toml_str(text).unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_points() {
        let store = store(
            r#"
            [["a.c"]]
            item = "defaults"
            all_args = "none"

            [["a.c"]]
            item = "function"
            name = "f"
            exit = { djb2 = "leave" }
            "#,
        );
        let options = EngineOptions::default();
        let decl = FunctionDecl::new(
            "f",
            vec![
                VarDecl::new("n", Type::record("N")),
                VarDecl::new("m", Type::record("N")).annotated("cross_check: { fixed = 3 }"),
            ],
            None,
        );
        let check = |point| resolve(&store, &options, "a.c", &decl, &point).unwrap();
        assert_eq!(check(CheckPoint::Entry), XCheck::Default);
        assert_eq!(check(CheckPoint::Exit), XCheck::Djb2("leave".to_string()));
        assert_eq!(check(CheckPoint::Argument("n".into())), XCheck::Disabled);
        assert_eq!(check(CheckPoint::Argument("m".into())), XCheck::Fixed(3));
    }

    #[test]
    fn test_dump_store_reloads() {
        let store = store(
            r#"
            [["a.c"]]
            item = "function"
            name = "f"
            entry = { djb2 = "a\u0001b" }
            "#,
        );
        let text = dump_store(&store).unwrap();
        let reloaded = ConfigStore::ingest(Config::from_toml_str(&text).unwrap()).unwrap();
        assert_eq!(
            reloaded.function_config_for("a.c", "f").unwrap().entry,
            Some(XCheck::Djb2("a\u{1}b".to_string()))
        );
    }

    #[test]
    fn test_function_decl_lookup() {
        let mut unit = TranslationUnit::new("a.c");
        unit.functions
            .push(FunctionDecl::new("f", Vec::new(), None));
        assert_eq!(function_decl(Some(&unit), "f").unwrap().name, "f");
        assert!(matches!(
            function_decl(Some(&unit), "g"),
            Err(Error::UnknownFunction { .. })
        ));
        assert!(function_decl(None, "g").unwrap().params.is_empty());
    }
}
