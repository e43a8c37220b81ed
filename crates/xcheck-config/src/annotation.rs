//! Inline `cross_check:` annotations.
//!
//! An annotation attached to a declaration overrides file configuration
//! for that declaration only. The payload uses the configuration grammar:
//! a bare keyword (`default`, `none`, `disabled`), a check table such as
//! `{ fixed = 5 }`, or for functions and structs an item fragment such as
//! `{ entry = "none", args = { len = "disabled" } }`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};
use crate::items::{FunctionConfig, StructConfig};
use crate::xcheck::XCheck;

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*cross_check\s*:(.*)$").expect("annotation regex is valid")
});

#[derive(Deserialize)]
struct Fragment<T> {
    value: T,
}

/// Payload of a `cross_check:` annotation, or `None` for other annotations.
#[must_use]
pub fn payload(annotation: &str) -> Option<&str> {
    ANNOTATION_RE
        .captures(annotation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn is_keyword(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_fragment<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str::<Fragment<T>>(&format!("value = {text}"))
        .map(|f| f.value)
        .map_err(|e| ConfigError::Annotation {
            text: text.to_string(),
            reason: e.message().to_string(),
        })
}

/// Parse a check payload.
pub fn parse_xcheck(text: &str) -> Result<XCheck> {
    if is_keyword(text) {
        return XCheck::from_keyword(text);
    }
    parse_fragment(text)
}

/// Parse a function item fragment; the name comes from the declaration.
pub fn parse_function_fragment(text: &str, name: &str) -> Result<FunctionConfig> {
    let mut cfg: FunctionConfig = parse_fragment(text)?;
    cfg.name = name.to_string();
    Ok(cfg)
}

/// Parse a struct item fragment; the name comes from the declaration.
pub fn parse_struct_fragment(text: &str, name: &str) -> Result<StructConfig> {
    let mut cfg: StructConfig = parse_fragment(text)?;
    cfg.name = name.to_string();
    Ok(cfg)
}

/// Check from the annotations of a parameter or field.
///
/// The last `cross_check:` annotation wins. Returns `None` when no
/// annotation applies.
#[must_use]
pub fn xcheck_from(annotations: &[String]) -> Option<Result<XCheck>> {
    annotations
        .iter()
        .filter_map(|a| payload(a))
        .next_back()
        .map(parse_xcheck)
}

/// Merge every function fragment found in `annotations`, in order.
pub fn function_config_from(annotations: &[String], name: &str) -> Result<Option<FunctionConfig>> {
    let mut merged: Option<FunctionConfig> = None;
    for text in annotations.iter().filter_map(|a| payload(a)) {
        let cfg = parse_function_fragment(text, name)?;
        match merged.as_mut() {
            Some(m) => m.update(&cfg)?,
            None => merged = Some(cfg),
        }
    }
    Ok(merged)
}

/// Merge every struct fragment found in `annotations`, in order.
pub fn struct_config_from(annotations: &[String], name: &str) -> Result<Option<StructConfig>> {
    let mut merged: Option<StructConfig> = None;
    for text in annotations.iter().filter_map(|a| payload(a)) {
        let cfg = parse_struct_fragment(text, name)?;
        match merged.as_mut() {
            Some(m) => m.update(&cfg)?,
            None => merged = Some(cfg),
        }
    }
    Ok(merged)
}
