//! Effective check policy of every check point.

use xcheck_config::{ConfigStore, DefaultsConfig, FunctionConfig, StructConfig, XCheck, annotation};
use xcheck_hash::{HasherKind, HasherPair, XCheckTag};
use xcheck_ir::{FunctionDecl, RecordDecl, SitePosition, VarDecl};

use crate::error::CheckError;
use crate::options::EngineOptions;

/// A function check point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckRole<'a> {
    Entry,
    Exit,
    Argument(&'a str),
    Return,
}

impl CheckRole<'_> {
    #[must_use]
    pub const fn tag(self) -> XCheckTag {
        match self {
            Self::Entry => XCheckTag::Entry,
            Self::Exit => XCheckTag::Exit,
            Self::Argument(_) => XCheckTag::Argument,
            Self::Return => XCheckTag::Return,
        }
    }
}

/// Everything that decides the checks of one function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionPolicy {
    /// File configuration merged with the declaration's own fragment.
    pub config: FunctionConfig,
    pub defaults: DefaultsConfig,
    pub engine_disable: bool,
}

impl FunctionPolicy {
    /// Nearest disable flag: function, then file, then engine.
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.config
            .disable_xchecks
            .or(self.defaults.disable_xchecks)
            .unwrap_or(self.engine_disable)
    }
}

/// Hasher pair named by optional `ahasher`/`shasher` settings, inheriting
/// unset halves from `inherited`.
pub fn hasher_pair(
    ahasher: Option<&str>,
    shasher: Option<&str>,
    inherited: HasherPair,
) -> Result<HasherPair, CheckError> {
    let parse = |name: &str| {
        name.parse::<HasherKind>()
            .map_err(|e| CheckError::UnknownHasher(e.0))
    };
    Ok(HasherPair {
        aggregate: ahasher.map(parse).transpose()?.unwrap_or(inherited.aggregate),
        simple: shasher.map(parse).transpose()?.unwrap_or(inherited.simple),
    })
}

/// Answers "what check applies here" from the store, the declarations'
/// annotations and the engine options.
#[derive(Clone, Copy, Debug)]
pub struct CheckSpecResolver<'a> {
    store: &'a ConfigStore,
    options: &'a EngineOptions,
}

impl<'a> CheckSpecResolver<'a> {
    #[must_use]
    pub const fn new(store: &'a ConfigStore, options: &'a EngineOptions) -> Self {
        Self { store, options }
    }

    /// File configuration of `decl` with its annotation fragment merged on
    /// top.
    ///
    /// A malformed fragment disables the function's own checks and is
    /// returned alongside the policy.
    #[must_use]
    pub fn effective_function_config(
        &self,
        file: &str,
        decl: &FunctionDecl,
    ) -> (FunctionPolicy, Option<CheckError>) {
        let mut config = self
            .store
            .function_config_for(file, &decl.name)
            .cloned()
            .unwrap_or_else(|| FunctionConfig::new(&decl.name));
        let problem = match annotation::function_config_from(&decl.annotations, &decl.name)
            .and_then(|fragment| fragment.map_or(Ok(()), |f| config.update(&f)))
        {
            Ok(()) => None,
            Err(err) => {
                config.disable_xchecks = Some(true);
                Some(CheckError::from_annotation(&decl.name, err))
            }
        };
        let policy = FunctionPolicy {
            config,
            defaults: self.store.defaults_for(file).cloned().unwrap_or_default(),
            engine_disable: self.options.disable_xchecks,
        };
        (policy, problem)
    }

    /// File configuration of `decl` with its annotation fragment merged on
    /// top. A malformed fragment is ignored and returned.
    #[must_use]
    pub fn effective_struct_config(
        &self,
        file: &str,
        decl: &RecordDecl,
    ) -> (StructConfig, Option<CheckError>) {
        let mut config = self
            .store
            .struct_config_for(file, &decl.name)
            .cloned()
            .unwrap_or_else(|| StructConfig::new(&decl.name));
        let mut merged = config.clone();
        let problem = match annotation::struct_config_from(&decl.annotations, &decl.name)
            .and_then(|fragment| fragment.map_or(Ok(()), |f| merged.update(&f)))
        {
            Ok(()) => {
                config = merged;
                None
            }
            Err(err) => Some(CheckError::from_annotation(&decl.name, err)),
        };
        (config, problem)
    }

    /// Check for a function check point.
    ///
    /// `annotations` are the parameter's own annotations for arguments;
    /// function-level fragments are already part of `policy`.
    pub fn resolve_function(
        &self,
        policy: &FunctionPolicy,
        role: CheckRole<'_>,
        annotations: &[String],
    ) -> Result<XCheck, CheckError> {
        if let CheckRole::Argument(name) = role {
            if let Some(inline) = annotation::xcheck_from(annotations) {
                return inline.map_err(|e| CheckError::from_annotation(name, e));
            }
        }

        let cfg = &policy.config;
        let defaults = &policy.defaults;
        let configured = match role {
            CheckRole::Entry => cfg.entry.as_ref().or(defaults.entry.as_ref()),
            CheckRole::Exit => cfg.exit.as_ref().or(defaults.exit.as_ref()),
            CheckRole::Return => cfg.ret.as_ref().or(defaults.ret.as_ref()),
            CheckRole::Argument(name) => cfg
                .args
                .get(name)
                .or(cfg.all_args.as_ref())
                .or(defaults.all_args.as_ref()),
        };
        Ok(match configured {
            Some(check) => check.clone(),
            None if policy.disabled() => XCheck::Disabled,
            None => XCheck::Default,
        })
    }

    /// Check for one record field.
    #[allow(clippy::unused_self)]
    pub fn resolve_field(
        &self,
        config: &StructConfig,
        field: &VarDecl,
    ) -> Result<XCheck, CheckError> {
        if let Some(inline) = annotation::xcheck_from(&field.annotations) {
            return inline.map_err(|e| CheckError::from_annotation(&field.name, e));
        }
        Ok(match config.fields.get(&field.name) {
            Some(check) => check.clone(),
            None if config.disable_xchecks == Some(true) => XCheck::Disabled,
            None => XCheck::Default,
        })
    }

    /// Extra custom checks at `position`, with their effective tags.
    ///
    /// These fire for every instrumented function, whatever its disable
    /// flags say.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn extra_checks(
        &self,
        policy: &FunctionPolicy,
        position: SitePosition,
    ) -> Vec<(XCheckTag, String)> {
        let (list, fallback) = match position {
            SitePosition::Entry => (&policy.config.entry_extra, XCheckTag::Entry),
            SitePosition::Exit => (&policy.config.exit_extra, XCheckTag::Exit),
        };
        list.iter()
            .map(|extra| (extra.tag_or(fallback), extra.custom.clone()))
            .collect()
    }

    /// Hasher pair of a function: its `ahasher`/`shasher` over the built-in
    /// pair.
    #[allow(clippy::unused_self)]
    pub fn function_hashers(&self, policy: &FunctionPolicy) -> Result<HasherPair, CheckError> {
        hasher_pair(
            policy.config.ahasher.as_deref(),
            policy.config.shasher.as_deref(),
            HasherPair::BUILTIN,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcheck_config::Config;
    use xcheck_ir::{ScalarKind, Type};

    fn store(text: &str) -> ConfigStore {
        ConfigStore::ingest(Config::from_toml_str(text).unwrap()).unwrap()
    }

    fn func(name: &str) -> FunctionDecl {
        FunctionDecl::new(
            name,
            vec![
                VarDecl::new("a", ScalarKind::I32.into()),
                VarDecl::new("b", ScalarKind::I32.into()),
            ],
            Some(ScalarKind::I32.into()),
        )
    }

    fn resolve(
        store: &ConfigStore,
        options: &EngineOptions,
        decl: &FunctionDecl,
        role: CheckRole<'_>,
    ) -> XCheck {
        let resolver = CheckSpecResolver::new(store, options);
        let (policy, problem) = resolver.effective_function_config("a.c", decl);
        assert_eq!(problem, None);
        resolver.resolve_function(&policy, role, &[]).unwrap()
    }

    #[test]
    fn test_no_config_means_default() {
        let store = ConfigStore::default();
        let options = EngineOptions::default();
        let decl = func("f");
        for role in [
            CheckRole::Entry,
            CheckRole::Exit,
            CheckRole::Return,
            CheckRole::Argument("a"),
        ] {
            assert_eq!(resolve(&store, &options, &decl, role), XCheck::Default);
        }
    }

    #[test]
    fn test_args_override_all_args() {
        let store = store(
            r#"
            [["a.c"]]
            item = "function"
            name = "f"
            all_args = "none"
            args = { b = { fixed = 7 } }
            "#,
        );
        let options = EngineOptions::default();
        let decl = func("f");
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Argument("a")), XCheck::Disabled);
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Argument("b")), XCheck::Fixed(7));
    }

    #[test]
    fn test_file_disable_with_function_override() {
        let store = store(
            r#"
            [["a.c"]]
            item = "defaults"
            disable_xchecks = true

            [["a.c"]]
            item = "function"
            name = "f"
            entry = "default"
            "#,
        );
        let options = EngineOptions::default();
        let decl = func("f");
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Entry), XCheck::Default);
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Exit), XCheck::Disabled);
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Argument("a")), XCheck::Disabled);
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Return), XCheck::Disabled);
    }

    #[test]
    fn test_function_disable_beats_file_enable() {
        let store = store(
            r#"
            [["a.c"]]
            item = "defaults"
            disable_xchecks = false

            [["a.c"]]
            item = "function"
            name = "f"
            disable_xchecks = true
            "#,
        );
        let options = EngineOptions::default();
        assert_eq!(resolve(&store, &options, &func("f"), CheckRole::Entry), XCheck::Disabled);
        assert_eq!(resolve(&store, &options, &func("g"), CheckRole::Entry), XCheck::Default);
    }

    #[test]
    fn test_engine_disable_is_lowest_precedence() {
        let store = store(
            r#"
            [["a.c"]]
            item = "function"
            name = "g"
            disable_xchecks = false
            "#,
        );
        let options = EngineOptions::new().with_disable_xchecks(true);
        assert_eq!(resolve(&store, &options, &func("f"), CheckRole::Entry), XCheck::Disabled);
        assert_eq!(resolve(&store, &options, &func("g"), CheckRole::Entry), XCheck::Default);
    }

    #[test]
    fn test_defaults_role_fields_apply() {
        let store = store(
            r#"
            [["a.c"]]
            item = "defaults"
            entry = { djb2 = "start" }
            all_args = { fixed = 1 }
            "#,
        );
        let options = EngineOptions::default();
        let decl = func("f");
        assert_eq!(
            resolve(&store, &options, &decl, CheckRole::Entry),
            XCheck::Djb2("start".to_string())
        );
        assert_eq!(resolve(&store, &options, &decl, CheckRole::Argument("b")), XCheck::Fixed(1));
    }

    #[test]
    fn test_annotations_take_precedence() {
        let store = store(
            r#"
            [["a.c"]]
            item = "function"
            name = "f"
            entry = "none"
            args = { a = "none" }
            "#,
        );
        let options = EngineOptions::default();
        let resolver = CheckSpecResolver::new(&store, &options);
        let decl = func("f").annotated("cross_check: { entry = { fixed = 3 } }");
        let (policy, problem) = resolver.effective_function_config("a.c", &decl);
        assert_eq!(problem, None);
        assert_eq!(
            resolver.resolve_function(&policy, CheckRole::Entry, &[]).unwrap(),
            XCheck::Fixed(3)
        );
        let param_notes = vec!["cross_check: default".to_string()];
        assert_eq!(
            resolver
                .resolve_function(&policy, CheckRole::Argument("a"), &param_notes)
                .unwrap(),
            XCheck::Default
        );
    }

    #[test]
    fn test_malformed_function_fragment_disables() {
        let store = ConfigStore::default();
        let options = EngineOptions::default();
        let resolver = CheckSpecResolver::new(&store, &options);
        let decl = func("f").annotated("cross_check: { entry = \"sometimes\" }");
        let (policy, problem) = resolver.effective_function_config("a.c", &decl);
        assert!(problem.is_some());
        assert!(policy.disabled());
    }

    #[test]
    fn test_malformed_param_annotation_is_error() {
        let store = ConfigStore::default();
        let options = EngineOptions::default();
        let resolver = CheckSpecResolver::new(&store, &options);
        let (policy, _) = resolver.effective_function_config("a.c", &func("f"));
        let notes = vec!["cross_check: maybe".to_string()];
        let err = resolver
            .resolve_function(&policy, CheckRole::Argument("a"), &notes)
            .unwrap_err();
        assert_eq!(
            err,
            CheckError::UnknownCheckKind {
                target: "a".to_string(),
                kind: "maybe".to_string(),
            }
        );
    }

    #[test]
    fn test_field_resolution() {
        let store = store(
            r#"
            [["a.c"]]
            item = "struct"
            name = "S"
            disable_xchecks = true
            fields = { keep = "default" }
            "#,
        );
        let options = EngineOptions::default();
        let resolver = CheckSpecResolver::new(&store, &options);
        let rec = RecordDecl::new(
            "S",
            vec![
                VarDecl::new("keep", ScalarKind::U8.into()),
                VarDecl::new("drop", ScalarKind::U8.into()),
                VarDecl::new("fixed", Type::pointer_to(ScalarKind::U8.into()))
                    .annotated("cross_check: { fixed = 9 }"),
            ],
        );
        let (cfg, problem) = resolver.effective_struct_config("a.c", &rec);
        assert_eq!(problem, None);
        let checks: Vec<_> = rec
            .fields
            .iter()
            .map(|f| resolver.resolve_field(&cfg, f).unwrap())
            .collect();
        assert_eq!(checks, [XCheck::Default, XCheck::Disabled, XCheck::Fixed(9)]);
    }

    #[test]
    fn test_extra_checks_ignore_disable() {
        let store = store(
            r#"
            [["a.c"]]
            item = "function"
            name = "f"
            disable_xchecks = true
            entry_extra = [{ custom = "log_entry" }, { tag = "argument", custom = "log_a(a)" }]
            exit_extra = [{ custom = "log_exit" }]
            "#,
        );
        let options = EngineOptions::default();
        let resolver = CheckSpecResolver::new(&store, &options);
        let (policy, _) = resolver.effective_function_config("a.c", &func("f"));
        assert_eq!(
            resolver.extra_checks(&policy, SitePosition::Entry),
            [
                (XCheckTag::Entry, "log_entry".to_string()),
                (XCheckTag::Argument, "log_a(a)".to_string()),
            ]
        );
        assert_eq!(
            resolver.extra_checks(&policy, SitePosition::Exit),
            [(XCheckTag::Exit, "log_exit".to_string())]
        );
    }

    #[test]
    fn test_hasher_pair_inherits_and_rejects_unknown() {
        let pair = hasher_pair(None, Some("jodyhash"), HasherPair::BUILTIN).unwrap();
        assert_eq!(pair.aggregate, HasherKind::Jodyhash);
        assert_eq!(pair.simple, HasherKind::Jodyhash);
        assert_eq!(
            hasher_pair(Some("md5"), None, HasherPair::BUILTIN),
            Err(CheckError::UnknownHasher("md5".to_string()))
        );
    }
}
