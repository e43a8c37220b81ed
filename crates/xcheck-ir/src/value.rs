//! References to values visible at a check point.

use std::fmt;

/// Expression naming a value at a check point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueRef {
    /// A parameter, local or global.
    Var(String),
    /// The value being returned, inside an exit check.
    ReturnValue,
    /// `base.field`, or `base->field` when `through_pointer` is set.
    Field {
        base: Box<ValueRef>,
        field: String,
        through_pointer: bool,
    },
    AddrOf(Box<ValueRef>),
    Deref(Box<ValueRef>),
}

impl ValueRef {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn field(base: Self, field: impl Into<String>) -> Self {
        Self::Field {
            base: Box::new(base),
            field: field.into(),
            through_pointer: false,
        }
    }

    pub fn arrow(base: Self, field: impl Into<String>) -> Self {
        Self::Field {
            base: Box::new(base),
            field: field.into(),
            through_pointer: true,
        }
    }

    #[must_use]
    pub fn addr_of(self) -> Self {
        Self::AddrOf(Box::new(self))
    }

    #[must_use]
    pub fn deref(self) -> Self {
        Self::Deref(Box::new(self))
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::ReturnValue => f.write_str("<return>"),
            Self::Field {
                base,
                field,
                through_pointer,
            } => {
                let op = if *through_pointer { "->" } else { "." };
                write!(f, "{base}{op}{field}")
            }
            Self::AddrOf(inner) => write!(f, "&{inner}"),
            Self::Deref(inner) => write!(f, "*{inner}"),
        }
    }
}
