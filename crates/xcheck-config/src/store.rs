//! Resolved configuration lookup tables.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::items::{Config, DefaultsConfig, FunctionConfig, ItemConfig, StructConfig};

/// Per-file configuration after merging repeated items.
#[derive(Clone, Debug, Default)]
struct FileEntry {
    defaults: DefaultsConfig,
    functions: FxHashMap<String, FunctionConfig>,
    structs: FxHashMap<String, StructConfig>,
}

/// Merged configuration indexed by file and by (file, name).
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    files: FxHashMap<String, FileEntry>,
}

impl ConfigStore {
    /// Merge every file's items left to right.
    pub fn ingest(config: Config) -> Result<Self> {
        let mut files: FxHashMap<String, FileEntry> = FxHashMap::default();
        for (file_name, items) in config.files {
            let entry = files.entry(file_name.clone()).or_default();
            for item in items {
                match item {
                    ItemConfig::Defaults(defaults) => entry.defaults.update(&defaults),
                    ItemConfig::Function(func) => {
                        if func.name.is_empty() {
                            return Err(ConfigError::MissingName {
                                file: file_name,
                                item: "function",
                            });
                        }
                        match entry.functions.get_mut(&func.name) {
                            Some(existing) => existing.update(&func)?,
                            None => {
                                entry.functions.insert(func.name.clone(), func);
                            }
                        }
                    }
                    ItemConfig::Struct(st) => {
                        if st.name.is_empty() {
                            return Err(ConfigError::MissingName {
                                file: file_name,
                                item: "struct",
                            });
                        }
                        match entry.structs.get_mut(&st.name) {
                            Some(existing) => existing.update(&st)?,
                            None => {
                                entry.structs.insert(st.name.clone(), st);
                            }
                        }
                    }
                }
            }
            debug!(
                file = %file_name,
                functions = entry.functions.len(),
                structs = entry.structs.len(),
                "ingested file config"
            );
        }
        Ok(Self { files })
    }

    /// Merged defaults for `file`.
    #[must_use]
    pub fn defaults_for(&self, file: &str) -> Option<&DefaultsConfig> {
        self.files.get(file).map(|f| &f.defaults)
    }

    #[must_use]
    pub fn function_config_for(&self, file: &str, name: &str) -> Option<&FunctionConfig> {
        self.files.get(file)?.functions.get(name)
    }

    #[must_use]
    pub fn struct_config_for(&self, file: &str, name: &str) -> Option<&StructConfig> {
        self.files.get(file)?.structs.get(name)
    }

    /// Configured file names, sorted.
    #[must_use]
    pub fn files(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function configs of `file`, sorted by name.
    #[must_use]
    pub fn functions_in(&self, file: &str) -> Vec<&FunctionConfig> {
        let mut funcs: Vec<_> = self
            .files
            .get(file)
            .map(|f| f.functions.values().collect())
            .unwrap_or_default();
        funcs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        funcs
    }

    /// Struct configs of `file`, sorted by name.
    #[must_use]
    pub fn structs_in(&self, file: &str) -> Vec<&StructConfig> {
        let mut structs: Vec<_> = self
            .files
            .get(file)
            .map(|f| f.structs.values().collect())
            .unwrap_or_default();
        structs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        structs
    }

    /// The merged store as a configuration with one item per function
    /// and struct. Ingesting it yields the same store.
    #[must_use]
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        for file in self.files() {
            let items = config.files.entry(file.to_string()).or_default();
            if let Some(defaults) = self.defaults_for(file) {
                if *defaults != DefaultsConfig::default() {
                    items.push(ItemConfig::Defaults(defaults.clone()));
                }
            }
            items.extend(
                self.functions_in(file)
                    .into_iter()
                    .map(|f| ItemConfig::Function(f.clone())),
            );
            items.extend(
                self.structs_in(file)
                    .into_iter()
                    .map(|st| ItemConfig::Struct(st.clone())),
            );
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ExtraXCheck;
    use crate::xcheck::XCheck;
    use pretty_assertions::assert_eq;

    fn defaults(entry: Option<u64>, exit: Option<u64>, disable: Option<bool>) -> ItemConfig {
        ItemConfig::Defaults(DefaultsConfig {
            disable_xchecks: disable,
            entry: entry.map(XCheck::Fixed),
            exit: exit.map(XCheck::Fixed),
            ..Default::default()
        })
    }

    #[test]
    fn test_defaults_merge_left_to_right() {
        let mut config = Config::default();
        config.push("a.c", defaults(Some(1), Some(10), None));
        config.push("a.c", defaults(Some(2), None, Some(true)));
        config.push("a.c", defaults(None, None, Some(false)));
        let store = ConfigStore::ingest(config).unwrap();

        let merged = store.defaults_for("a.c").unwrap();
        assert_eq!(merged.entry, Some(XCheck::Fixed(2)));
        assert_eq!(merged.exit, Some(XCheck::Fixed(10)));
        assert_eq!(merged.disable_xchecks, Some(false));
    }

    #[test]
    fn test_defaults_merge_equals_pairwise_fold() {
        let items = [
            defaults(Some(1), None, Some(true)),
            defaults(None, Some(4), None),
            defaults(Some(3), None, None),
        ];
        let mut config = Config::default();
        for item in &items {
            config.push("f.c", item.clone());
        }
        let store = ConfigStore::ingest(config).unwrap();

        let mut folded = DefaultsConfig::default();
        for item in &items {
            let ItemConfig::Defaults(d) = item else {
                unreachable!()
            };
            folded.update(d);
        }
        assert_eq!(store.defaults_for("f.c"), Some(&folded));
    }

    #[test]
    fn test_repeated_function_items_merge() {
        let mut first = FunctionConfig::new("foo");
        first.entry = Some(XCheck::Fixed(1));
        first.exit_extra.push(ExtraXCheck::new("a"));
        let mut second = FunctionConfig::new("foo");
        second.exit = Some(XCheck::Disabled);
        second.exit_extra.push(ExtraXCheck::new("b"));

        let mut config = Config::default();
        config.push("a.c", ItemConfig::Function(first));
        config.push("a.c", ItemConfig::Function(second));
        let store = ConfigStore::ingest(config).unwrap();

        let foo = store.function_config_for("a.c", "foo").unwrap();
        assert_eq!(foo.entry, Some(XCheck::Fixed(1)));
        assert_eq!(foo.exit, Some(XCheck::Disabled));
        assert_eq!(foo.exit_extra.len(), 2);
    }

    #[test]
    fn test_lookups_are_keyed_by_file() {
        let mut config = Config::default();
        config.push("a.c", ItemConfig::Struct(StructConfig::new("S")));
        let store = ConfigStore::ingest(config).unwrap();

        assert!(store.struct_config_for("a.c", "S").is_some());
        assert!(store.struct_config_for("b.c", "S").is_none());
        assert!(store.function_config_for("a.c", "S").is_none());
        assert!(store.defaults_for("b.c").is_none());
        assert_eq!(store.files(), ["a.c"]);
    }

    const MERGED: &str = r#"
        [["b.c"]]
        item = "struct"
        name = "S"
        fields = { a = "none", b = { fixed = 2 } }
        ahasher = "simple"

        [["a.c"]]
        item = "defaults"
        disable_xchecks = true
        all_args = { djb2 = "x" }

        [["a.c"]]
        item = "function"
        name = "g"
        entry = "default"
        args = { p = { custom = "h(&p)" } }
        entry_extra = [{ custom = "e1" }]

        [["a.c"]]
        item = "function"
        name = "g"
        entry_extra = [{ tag = "return", custom = "e2" }]
    "#;

    fn reload(store: &ConfigStore) -> (String, ConfigStore) {
        let text = store.to_config().to_toml_string().unwrap();
        let reloaded = ConfigStore::ingest(Config::from_toml_str(&text).unwrap()).unwrap();
        (text, reloaded)
    }

    #[test]
    fn test_written_config_reloads_to_same_store() {
        let store = ConfigStore::ingest(Config::from_toml_str(MERGED).unwrap()).unwrap();
        let (text, reloaded) = reload(&store);

        assert_eq!(reloaded.files(), ["a.c", "b.c"]);
        assert_eq!(reloaded.defaults_for("a.c"), store.defaults_for("a.c"));
        assert_eq!(reloaded.defaults_for("b.c"), Some(&DefaultsConfig::default()));
        assert_eq!(
            reloaded.function_config_for("a.c", "g"),
            store.function_config_for("a.c", "g")
        );
        assert_eq!(
            reloaded.struct_config_for("b.c", "S"),
            store.struct_config_for("b.c", "S")
        );
        let g = reloaded.function_config_for("a.c", "g").unwrap();
        let extras: Vec<_> = g.entry_extra.iter().map(|e| e.custom.as_str()).collect();
        assert_eq!(extras, ["e1", "e2"]);
        assert_eq!(reloaded.to_config().to_toml_string().unwrap(), text);
    }

    #[test]
    fn test_control_characters_survive_reload() {
        let mut func = FunctionConfig::new("f\u{7}");
        func.entry = Some(XCheck::Djb2("a\u{1}b".to_string()));
        func.args.insert("x\ty".into(), XCheck::Custom("h(\"q\")\n".to_string()));
        func.exit_extra.push(ExtraXCheck::new("log\u{1b}"));
        let mut st = StructConfig::new("S");
        st.field_hasher = Some("fh\\".to_string());

        let mut config = Config::default();
        config.push("dir\u{1}/a.c", ItemConfig::Function(func.clone()));
        config.push("dir\u{1}/a.c", ItemConfig::Struct(st.clone()));
        let store = ConfigStore::ingest(config).unwrap();

        let (_, reloaded) = reload(&store);
        assert_eq!(reloaded.function_config_for("dir\u{1}/a.c", "f\u{7}"), Some(&func));
        assert_eq!(reloaded.struct_config_for("dir\u{1}/a.c", "S"), Some(&st));
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut config = Config::default();
        config.push("a.c", ItemConfig::Function(FunctionConfig::default()));
        let err = ConfigStore::ingest(config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingName { item: "function", .. }));
    }
}
