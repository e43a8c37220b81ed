//! Check tags and the fingerprint record reported at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a check applies. The discriminant is the tag reported at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum XCheckTag {
    Unknown = 0,
    Entry = 1,
    Exit = 2,
    #[serde(alias = "arg")]
    Argument = 3,
    Return = 4,
}

impl XCheckTag {
    /// Numeric tag passed to the runtime.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::Argument => "argument",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for XCheckTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown check tag `{0}`")]
pub struct UnknownTag(pub String);

impl FromStr for XCheckTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Self::Entry),
            "exit" => Ok(Self::Exit),
            "arg" | "argument" => Ok(Self::Argument),
            "return" => Ok(Self::Return),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

/// One reported cross-check: a tag and the value's fingerprint.
///
/// Displays as `XCHECK(<tag>):<decimal>/0x<hex>`, with the hex part
/// padded to at least eight digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub tag: XCheckTag,
    pub value: u64,
}

impl Fingerprint {
    #[must_use]
    pub const fn new(tag: XCheckTag, value: u64) -> Self {
        Self { tag, value }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "XCHECK({}):{}/0x{:08x}",
            self.tag.value(),
            self.value,
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_display_pads_short_values() {
        let fp = Fingerprint::new(XCheckTag::Return, 18);
        assert_eq!(fp.to_string(), "XCHECK(4):18/0x00000012");
    }

    #[test]
    fn test_fingerprint_display_wide_values() {
        let fp = Fingerprint::new(XCheckTag::Argument, 1_143_276_485_240_798_846);
        assert_eq!(
            fp.to_string(),
            "XCHECK(3):1143276485240798846/0xfddbbe7eed5be7e"
        );
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!("arg".parse::<XCheckTag>(), Ok(XCheckTag::Argument));
        assert_eq!("exit".parse::<XCheckTag>(), Ok(XCheckTag::Exit));
        assert!("middle".parse::<XCheckTag>().is_err());
    }
}
