//! Check specifications.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// What to compute and report at a check point.
///
/// Deserializes from the bare words `default`, `none` or `disabled`, or
/// from a table holding exactly one of `fixed`, `djb2` or `custom`.
/// Serializes back to the same forms, with `disabled` as the keyword.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawXCheck", into = "RawXCheck")]
pub enum XCheck {
    /// Use the synthesized hash of the value.
    #[default]
    Default,
    /// Emit nothing.
    Disabled,
    /// Report a constant.
    Fixed(u64),
    /// Report the djb2 hash of a string.
    Djb2(String),
    /// Call a user function: `name` or `name(arg, &arg, *arg)`.
    Custom(String),
}

impl XCheck {
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Parse a bare keyword form.
    pub fn from_keyword(word: &str) -> Result<Self> {
        match word {
            "default" => Ok(Self::Default),
            "none" | "disabled" => Ok(Self::Disabled),
            other => Err(ConfigError::UnknownCheckKind(other.to_string())),
        }
    }

    /// The check as an inline TOML value, e.g. `"default"` or
    /// `{ fixed = 7 }`.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::Value::try_from(self)?.to_string())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawXCheck {
    Keyword(String),
    Table(RawXCheckTable),
}

#[derive(Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawXCheckTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    fixed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    djb2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom: Option<String>,
}

impl From<XCheck> for RawXCheck {
    fn from(check: XCheck) -> Self {
        match check {
            XCheck::Default => Self::Keyword("default".to_string()),
            XCheck::Disabled => Self::Keyword("disabled".to_string()),
            XCheck::Fixed(k) => Self::Table(RawXCheckTable {
                fixed: Some(k),
                ..Default::default()
            }),
            XCheck::Djb2(s) => Self::Table(RawXCheckTable {
                djb2: Some(s),
                ..Default::default()
            }),
            XCheck::Custom(s) => Self::Table(RawXCheckTable {
                custom: Some(s),
                ..Default::default()
            }),
        }
    }
}

impl TryFrom<RawXCheck> for XCheck {
    type Error = ConfigError;

    fn try_from(raw: RawXCheck) -> Result<Self> {
        match raw {
            RawXCheck::Keyword(word) => Self::from_keyword(&word),
            RawXCheck::Table(RawXCheckTable {
                fixed,
                djb2,
                custom,
            }) => match (fixed, djb2, custom) {
                (Some(k), None, None) => Ok(Self::Fixed(k)),
                (None, Some(s), None) => Ok(Self::Djb2(s)),
                (None, None, Some(s)) => Ok(Self::Custom(s)),
                _ => Err(ConfigError::AmbiguousCheck),
            },
        }
    }
}
