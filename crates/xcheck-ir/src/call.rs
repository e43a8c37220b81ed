//! Instrumentation calls handed to the host.

use std::fmt;

use xcheck_hash::XCheckTag;

use crate::routine::HashFunction;
use crate::types::Type;
use crate::value::ValueRef;

/// Where in a function a call is spliced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SitePosition {
    /// After the prologue: entry and argument checks.
    Entry,
    /// Before returning: exit and return checks.
    Exit,
}

/// A splice point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CheckSite {
    pub function: String,
    pub position: SitePosition,
}

impl CheckSite {
    pub fn entry(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            position: SitePosition::Entry,
        }
    }

    pub fn exit(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            position: SitePosition::Exit,
        }
    }
}

impl fmt::Display for CheckSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = match self.position {
            SitePosition::Entry => "entry",
            SitePosition::Exit => "exit",
        };
        write!(f, "{}@{pos}", self.function)
    }
}

/// The value reported by a check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckValue {
    Const(u64),
    /// Call a synthesized routine on `arg` with a depth budget.
    Hash {
        routine: HashFunction,
        arg: ValueRef,
        depth: usize,
    },
    /// Call a user check function.
    Custom { function: String, args: Vec<ValueRef> },
}

/// One runtime report: `rb_xcheck(tag, value)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckCall {
    pub tag: XCheckTag,
    pub value: CheckValue,
}

/// Parameter of a host-declared function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Value(Type),
    /// Untyped pointer, for field hashers shared across field types.
    Opaque,
    /// Remaining depth budget.
    Depth,
}

/// Signature of a user function; every such function returns a 64-bit
/// fingerprint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<ParamType>,
}

impl Signature {
    #[must_use]
    pub const fn new(params: Vec<ParamType>) -> Self {
        Self { params }
    }
}

/// A function known to the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutineHandle {
    pub name: String,
}

/// An emitted call, in host emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallHandle(pub usize);
