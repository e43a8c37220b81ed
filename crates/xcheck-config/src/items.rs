//! Configuration items and their merge rules.
//!
//! Merging follows one rule for every item kind: set scalar fields of the
//! incoming item replace ours, map fields merge key-wise with the incoming
//! entry winning, and extra-check lists are appended.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use xcheck_hash::XCheckTag;

use crate::error::{ConfigError, Result};
use crate::xcheck::XCheck;

/// Additional custom check run next to the primary entry or exit check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtraXCheck {
    /// Tag to report; defaults to the tag of the list it belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<XCheckTag>,
    /// Custom function call, `name` or `name(args...)`.
    pub custom: String,
}

impl ExtraXCheck {
    pub fn new(custom: impl Into<String>) -> Self {
        Self {
            tag: None,
            custom: custom.into(),
        }
    }

    #[must_use]
    pub fn tag_or(&self, fallback: XCheckTag) -> XCheckTag {
        self.tag.unwrap_or(fallback)
    }
}

fn update_opt<T: Clone>(ours: &mut Option<T>, theirs: &Option<T>) {
    if let Some(v) = theirs {
        *ours = Some(v.clone());
    }
}

fn update_map(ours: &mut BTreeMap<String, XCheck>, theirs: &BTreeMap<String, XCheck>) {
    for (name, check) in theirs {
        ours.insert(name.clone(), check.clone());
    }
}

/// Per-file defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_xchecks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_args: Option<XCheck>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub ret: Option<XCheck>,
}

impl DefaultsConfig {
    /// Overwrite our fields with every field set in `other`.
    pub fn update(&mut self, other: &Self) {
        update_opt(&mut self.disable_xchecks, &other.disable_xchecks);
        update_opt(&mut self.entry, &other.entry);
        update_opt(&mut self.exit, &other.exit);
        update_opt(&mut self.all_args, &other.all_args);
        update_opt(&mut self.ret, &other.ret);
    }
}

/// Per-function settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_xchecks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_args: Option<XCheck>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, XCheck>,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub ret: Option<XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahasher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shasher: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_extra: Vec<ExtraXCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit_extra: Vec<ExtraXCheck>,
}

impl FunctionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merge `other` into this config. Both must describe the same function.
    pub fn update(&mut self, other: &Self) -> Result<()> {
        if self.name != other.name {
            return Err(ConfigError::NameConflict {
                item: "function",
                existing: self.name.clone(),
                incoming: other.name.clone(),
            });
        }
        update_opt(&mut self.disable_xchecks, &other.disable_xchecks);
        update_opt(&mut self.entry, &other.entry);
        update_opt(&mut self.exit, &other.exit);
        update_opt(&mut self.all_args, &other.all_args);
        update_opt(&mut self.ret, &other.ret);
        update_opt(&mut self.ahasher, &other.ahasher);
        update_opt(&mut self.shasher, &other.shasher);
        update_map(&mut self.args, &other.args);
        // TODO: confirm whether repeated extra checks should replace rather than append
        self.entry_extra.extend(other.entry_extra.iter().cloned());
        self.exit_extra.extend(other.exit_extra.iter().cloned());
        Ok(())
    }
}

/// Per-structure settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructConfig {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_xchecks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_hasher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_hash: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, XCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahasher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shasher: Option<String>,
}

impl StructConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merge `other` into this config. Both must describe the same struct.
    pub fn update(&mut self, other: &Self) -> Result<()> {
        if self.name != other.name {
            return Err(ConfigError::NameConflict {
                item: "struct",
                existing: self.name.clone(),
                incoming: other.name.clone(),
            });
        }
        update_opt(&mut self.disable_xchecks, &other.disable_xchecks);
        update_opt(&mut self.field_hasher, &other.field_hasher);
        update_opt(&mut self.custom_hash, &other.custom_hash);
        update_opt(&mut self.ahasher, &other.ahasher);
        update_opt(&mut self.shasher, &other.shasher);
        update_map(&mut self.fields, &other.fields);
        Ok(())
    }
}

/// One configuration item. Exactly one payload per item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "lowercase")]
pub enum ItemConfig {
    Defaults(DefaultsConfig),
    Function(FunctionConfig),
    Struct(StructConfig),
}

/// Items of one source file, in order.
pub type FileConfig = Vec<ItemConfig>;

/// Full configuration: source file name to its items.
///
/// In TOML every file is an array of tables keyed by the file name:
///
/// ```toml
/// [["struct1.c"]]
/// item = "defaults"
/// disable_xchecks = true
///
/// [["struct1.c"]]
/// item = "function"
/// name = "foo"
/// entry = "default"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub files: BTreeMap<String, FileConfig>,
}

impl Config {
    /// Parse a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading cross-check config");
        Self::from_toml_str(&text)
    }

    /// Render as a TOML document that [`Config::from_toml_str`] reads back.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Append another configuration's items after ours, file by file.
    pub fn extend(&mut self, other: Self) {
        for (file, items) in other.files {
            self.files.entry(file).or_default().extend(items);
        }
    }

    /// Add one item for `file`.
    pub fn push(&mut self, file: impl Into<String>, item: ItemConfig) {
        self.files.entry(file.into()).or_default().push(item);
    }
}
