//! Value types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use xcheck_hash::ScalarKind;

/// Record flavour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Struct,
    Union,
}

impl RecordKind {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }
}

/// Pointer target whose contents are never hashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opaque {
    Void,
    Function,
}

impl Opaque {
    const fn ident(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Function => "fn",
        }
    }
}

/// Type of a hashed value.
///
/// Records are referenced by name; their fields live in the unit's
/// record declarations, so self-referential records need no cyclic
/// ownership.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Type {
    Scalar(ScalarKind),
    Pointer(Box<Type>),
    Array { elem: Box<Type>, len: u64 },
    Record { kind: RecordKind, name: String },
    /// `void` or a function type; only meaningful behind a pointer.
    Opaque(Opaque),
}

impl Type {
    #[must_use]
    pub fn pointer_to(ty: Self) -> Self {
        Self::Pointer(Box::new(ty))
    }

    #[must_use]
    pub fn array_of(elem: Self, len: u64) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn record(name: impl Into<String>) -> Self {
        Self::Record {
            kind: RecordKind::Struct,
            name: name.into(),
        }
    }

    pub fn union(name: impl Into<String>) -> Self {
        Self::Record {
            kind: RecordKind::Union,
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Whether values of this type are pointers the engine must not
    /// follow. A bare function type counts, since it decays to one.
    #[must_use]
    pub fn is_opaque_pointer(&self) -> bool {
        match self {
            Self::Pointer(inner) => matches!(**inner, Self::Opaque(_)),
            Self::Opaque(_) => true,
            _ => false,
        }
    }

    /// Whether a function type appears anywhere in this type.
    #[must_use]
    pub fn mentions_function(&self) -> bool {
        match self {
            Self::Opaque(Opaque::Function) => true,
            Self::Pointer(inner) | Self::Array { elem: inner, .. } => inner.mentions_function(),
            _ => false,
        }
    }

    /// Pointee of a pointer type.
    #[must_use]
    pub fn pointee(&self) -> Option<&Self> {
        match self {
            Self::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Parameter type used to pass a value of this type to its hash
    /// routine: records go by address, arrays decay to element pointers
    /// and functions to function pointers.
    #[must_use]
    pub fn decayed(&self) -> Self {
        match self {
            Self::Record { .. } | Self::Opaque(_) => Self::pointer_to(self.clone()),
            Self::Array { elem, .. } => Self::Pointer(elem.clone()),
            other => other.clone(),
        }
    }

    /// Structural description used to compose routine names.
    ///
    /// `candidate` names an anonymous record.
    #[must_use]
    pub fn name_elements(&self, candidate: Option<&str>) -> Vec<String> {
        match self {
            Self::Scalar(kind) => vec![kind.ident().to_string()],
            Self::Pointer(inner) => {
                let mut elems = inner.name_elements(candidate);
                elems.push("ptr".to_string());
                elems
            }
            Self::Array { elem, len } => {
                let mut elems = elem.name_elements(candidate);
                elems.push("array".to_string());
                elems.push(len.to_string());
                elems
            }
            Self::Record { kind, name } => {
                let name = if name.is_empty() {
                    candidate.unwrap_or("anon")
                } else {
                    name.as_str()
                };
                vec![kind.keyword().to_string(), name.to_string()]
            }
            Self::Opaque(opaque) => vec![opaque.ident().to_string()],
        }
    }
}

impl From<ScalarKind> for Type {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.c_name()),
            Self::Pointer(inner) => write!(f, "{inner}*"),
            Self::Array { elem, len } => write!(f, "{elem}[{len}]"),
            Self::Record { kind, name } => write!(f, "{} {name}", kind.keyword()),
            Self::Opaque(Opaque::Void) => f.write_str("void"),
            Self::Opaque(Opaque::Function) => f.write_str("function"),
        }
    }
}

/// Error parsing a type spelling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("missing record name in `{0}`")]
    MissingRecordName(String),
    #[error("malformed array bound in `{0}`")]
    BadArrayBound(String),
    #[error("`void` is only allowed behind a pointer in `{0}`")]
    VoidValue(String),
}

fn parse_scalar(name: &str) -> Option<ScalarKind> {
    let kind = match name {
        "uint8_t" | "unsigned char" => ScalarKind::U8,
        "uint16_t" | "unsigned short" => ScalarKind::U16,
        "uint32_t" | "unsigned" | "unsigned int" => ScalarKind::U32,
        "uint64_t" | "unsigned long" | "unsigned long long" | "size_t" => ScalarKind::U64,
        "int8_t" | "char" | "signed char" => ScalarKind::I8,
        "int16_t" | "short" => ScalarKind::I16,
        "int32_t" | "int" => ScalarKind::I32,
        "int64_t" | "long" | "long long" | "ptrdiff_t" => ScalarKind::I64,
        "_Bool" | "bool" => ScalarKind::Bool,
        "float" => ScalarKind::F32,
        "double" => ScalarKind::F64,
        _ => return None,
    };
    Some(kind)
}

/// `ret (*)(params)`, with any number of stars in the declarator.
fn parse_function_pointer(text: &str) -> Option<Type> {
    let open = text.find('(')?;
    let rest = &text[open + 1..];
    let close = rest.find(')')?;
    let declarator = &rest[..close];
    let stars = declarator.matches('*').count();
    if stars == 0 || !declarator.chars().all(|c| c == '*' || c.is_whitespace()) {
        return None;
    }
    let params = rest[close + 1..].trim();
    if !(params.starts_with('(') && params.ends_with(')')) {
        return None;
    }
    let mut ty = Type::Opaque(Opaque::Function);
    for _ in 0..stars {
        ty = Type::pointer_to(ty);
    }
    Some(ty)
}

impl FromStr for Type {
    type Err = TypeParseError;

    /// Parse a C-like spelling: `int`, `struct Node*`, `uint8_t[16]`,
    /// `double*[2][3]`, `void *`, `int (*)(int)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.contains('(') {
            return parse_function_pointer(text)
                .ok_or_else(|| TypeParseError::UnknownType(s.to_string()));
        }
        let (head, dims) = match text.find('[') {
            Some(idx) => text.split_at(idx),
            None => (text, ""),
        };
        let stars = head.chars().rev().take_while(|c| *c == '*' || c.is_whitespace());
        let ptr_depth = stars.filter(|c| *c == '*').count();
        let base = head.trim_end_matches(|c: char| c == '*' || c.is_whitespace());
        let base = base.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut ty = if let Some(name) = base.strip_prefix("struct ") {
            Self::record(name.trim())
        } else if let Some(name) = base.strip_prefix("union ") {
            Self::union(name.trim())
        } else if base == "struct" || base == "union" {
            return Err(TypeParseError::MissingRecordName(s.to_string()));
        } else if base == "void" {
            if ptr_depth == 0 {
                return Err(TypeParseError::VoidValue(s.to_string()));
            }
            Self::Opaque(Opaque::Void)
        } else {
            Self::Scalar(
                parse_scalar(&base).ok_or_else(|| TypeParseError::UnknownType(s.to_string()))?,
            )
        };
        for _ in 0..ptr_depth {
            ty = Self::pointer_to(ty);
        }

        let mut bounds = Vec::new();
        let mut rest = dims.trim();
        while let Some(after_open) = rest.strip_prefix('[') {
            let close = after_open
                .find(']')
                .ok_or_else(|| TypeParseError::BadArrayBound(s.to_string()))?;
            let len = after_open[..close]
                .trim()
                .parse::<u64>()
                .map_err(|_| TypeParseError::BadArrayBound(s.to_string()))?;
            bounds.push(len);
            rest = after_open[close + 1..].trim_start();
        }
        if !rest.is_empty() {
            return Err(TypeParseError::BadArrayBound(s.to_string()));
        }
        for len in bounds.into_iter().rev() {
            ty = Self::array_of(ty, len);
        }
        Ok(ty)
    }
}

impl TryFrom<String> for Type {
    type Error = TypeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
