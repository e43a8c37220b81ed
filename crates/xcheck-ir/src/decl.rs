//! Declarations of a translation unit.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{RecordKind, Type};

/// Variable-like declaration: parameter, local, global or field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VarDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    /// Raw annotation strings attached to the declaration.
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// Structure or union declaration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RecordDecl {
    #[serde(default)]
    pub kind: RecordKind,
    pub name: String,
    /// Fields in declaration order. Empty with `complete = false` for a
    /// forward declaration.
    #[serde(default)]
    pub fields: Vec<VarDecl>,
    #[serde(default = "default_true")]
    pub complete: bool,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl RecordDecl {
    pub fn new(name: impl Into<String>, fields: Vec<VarDecl>) -> Self {
        Self {
            kind: RecordKind::Struct,
            name: name.into(),
            fields,
            complete: true,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Type naming this record.
    #[must_use]
    pub fn ty(&self) -> Type {
        Type::Record {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Function declaration or definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<VarDecl>,
    /// Return type; `None` for `void`.
    #[serde(default, rename = "return")]
    pub ret: Option<Type>,
    #[serde(default)]
    pub locals: Vec<VarDecl>,
    /// Whether the function has a body in this unit. Only definitions
    /// are instrumented.
    #[serde(default = "default_true")]
    pub has_body: bool,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, params: Vec<VarDecl>, ret: Option<Type>) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            locals: Vec::new(),
            has_body: true,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// Errors loading a unit description.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("failed to parse unit description: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate {kind} `{name}` in unit `{file}`")]
    Duplicate {
        kind: &'static str,
        name: String,
        file: String,
    },
}

/// One compilation unit as seen by the instrumentation engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TranslationUnit {
    /// Source file name; selects the file's configuration.
    pub file: String,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
    #[serde(default)]
    pub globals: Vec<VarDecl>,
    /// Functions in declaration order.
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

impl TranslationUnit {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML unit description.
    pub fn from_toml_str(text: &str) -> Result<Self, UnitError> {
        let unit: Self = toml::from_str(text)?;
        unit.validate()?;
        Ok(unit)
    }

    /// Load a TOML unit description.
    pub fn load(path: &Path) -> Result<Self, UnitError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), UnitError> {
        let mut seen = FxHashSet::default();
        for rec in self.records.iter().filter(|r| r.complete) {
            if !seen.insert((rec.kind, rec.name.as_str())) {
                return Err(UnitError::Duplicate {
                    kind: rec.kind.keyword(),
                    name: rec.name.clone(),
                    file: self.file.clone(),
                });
            }
        }
        let mut seen = FxHashSet::default();
        for func in self.functions.iter().filter(|f| f.has_body) {
            if !seen.insert(func.name.as_str()) {
                return Err(UnitError::Duplicate {
                    kind: "function",
                    name: func.name.clone(),
                    file: self.file.clone(),
                });
            }
        }
        Ok(())
    }

    /// Declaration of a record: the complete one when there is one,
    /// otherwise the last forward declaration.
    #[must_use]
    pub fn record(&self, kind: RecordKind, name: &str) -> Option<&RecordDecl> {
        let mut found = None;
        for rec in self.records.iter().filter(|r| r.kind == kind && r.name == name) {
            if rec.complete {
                return Some(rec);
            }
            found = Some(rec);
        }
        found
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }
}
