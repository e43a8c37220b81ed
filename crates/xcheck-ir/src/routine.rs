//! Synthesized hash routine descriptors.

use std::fmt;

use xcheck_hash::{HasherKind, HasherPair, ScalarKind};

use crate::types::Type;
use crate::value::ValueRef;

/// Common prefix of every synthesized routine.
pub const HASH_FUNCTION_PREFIX: &str = "__xcheck_hash";

/// Composed routine name.
///
/// Two values of the same type hashed under the same hasher pair always
/// get the same name, so routines are shared and addressed by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HashFunctionName {
    /// Hasher pair, present only when it differs from the built-in one.
    pub hashers: Option<HasherPair>,
    pub elements: Vec<String>,
}

impl HashFunctionName {
    #[must_use]
    pub fn new(hashers: HasherPair, elements: Vec<String>) -> Self {
        Self {
            hashers: (!hashers.is_builtin()).then_some(hashers),
            elements,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        let mut name = HASH_FUNCTION_PREFIX.to_string();
        if let Some(pair) = self.hashers {
            name.push('_');
            name.push_str(pair.aggregate.name());
            name.push('_');
            name.push_str(pair.simple.name());
        }
        for elem in &self.elements {
            name.push('_');
            name.push_str(elem);
        }
        name
    }
}

impl fmt::Display for HashFunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// How a value reaches its hash routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgPassing {
    /// Passed as is.
    Value,
    /// Records are passed by address.
    Address,
    /// Arrays decay to a pointer to their first element, functions to a
    /// function pointer.
    Decay,
}

/// A hash routine as seen by its callers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HashFunction {
    pub name: HashFunctionName,
    /// Type of the hashed value.
    pub orig_ty: Type,
    /// Parameter type of the routine.
    pub actual_ty: Type,
}

impl HashFunction {
    #[must_use]
    pub fn new(name: HashFunctionName, orig_ty: Type) -> Self {
        let actual_ty = orig_ty.decayed();
        Self {
            name,
            orig_ty,
            actual_ty,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.name.full_name()
    }

    #[must_use]
    pub const fn passing(&self) -> ArgPassing {
        match self.orig_ty {
            Type::Record { .. } => ArgPassing::Address,
            Type::Array { .. } | Type::Opaque(_) => ArgPassing::Decay,
            _ => ArgPassing::Value,
        }
    }

    /// Argument expression passing `value` to this routine.
    #[must_use]
    pub fn argument(&self, value: ValueRef) -> ValueRef {
        match self.passing() {
            ArgPassing::Address => value.addr_of(),
            ArgPassing::Value | ArgPassing::Decay => value,
        }
    }
}

/// Contribution of one record field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldHash {
    /// The field's own routine at `depth - 1`.
    Routine { field: String, routine: HashFunction },
    /// The struct's `field_hasher(&field, depth - 1)`.
    FieldHasher { field: String, function: String },
    /// A fixed value (`fixed` or `djb2` checks).
    Const { field: String, value: u64 },
    /// A user function applied to values derived from the record.
    Custom {
        field: String,
        function: String,
        args: Vec<ValueRef>,
    },
}

impl FieldHash {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Routine { field, .. }
            | Self::FieldHasher { field, .. }
            | Self::Const { field, .. }
            | Self::Custom { field, .. } => field,
        }
    }
}

/// Body of a synthesized routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutineBody {
    Scalar(ScalarKind),
    /// Null, depth-exhausted or pointee-mixing pointer hash.
    Pointer { pointee: HashFunction },
    /// Pointer to `void` or a function: null or leaf, never followed.
    OpaquePointer,
    /// Aggregate fold of every element, at unchanged depth.
    Array {
        element: HashFunction,
        len: u64,
        aggregate: HasherKind,
    },
    /// Aggregate fold of simple-hashed field fingerprints.
    Record {
        hashers: HasherPair,
        fields: Vec<FieldHash>,
    },
    /// The struct's `custom_hash(x, depth)`.
    CustomRecord { function: String },
    /// Record without a usable definition.
    Opaque,
}

/// A finalized routine, ready for the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashRoutine {
    pub func: HashFunction,
    pub body: RoutineBody,
}

impl HashRoutine {
    #[must_use]
    pub fn full_name(&self) -> String {
        self.func.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pair_omitted_from_name() {
        let ty = Type::pointer_to(Type::record("Node"));
        let name = HashFunctionName::new(HasherPair::BUILTIN, ty.name_elements(None));
        assert_eq!(name.full_name(), "__xcheck_hash_struct_Node_ptr");
        assert!(name.hashers.is_none());
    }

    #[test]
    fn test_custom_pair_prefixes_name() {
        let pair = HasherPair {
            aggregate: HasherKind::Simple,
            simple: HasherKind::Simple,
        };
        let name = HashFunctionName::new(pair, Type::record("Foo").name_elements(None));
        assert_eq!(name.full_name(), "__xcheck_hash_simple_simple_struct_Foo");
    }

    #[test]
    fn test_passing() {
        let rec = HashFunction::new(
            HashFunctionName::new(HasherPair::BUILTIN, vec!["struct".into(), "Foo".into()]),
            Type::record("Foo"),
        );
        assert_eq!(rec.passing(), ArgPassing::Address);
        assert_eq!(rec.actual_ty, Type::pointer_to(Type::record("Foo")));
        assert_eq!(
            rec.argument(ValueRef::var("x")),
            ValueRef::var("x").addr_of()
        );

        let arr = HashFunction::new(
            HashFunctionName::new(HasherPair::BUILTIN, vec!["int32_t".into()]),
            Type::array_of(ScalarKind::I32.into(), 3),
        );
        assert_eq!(arr.passing(), ArgPassing::Decay);
        assert_eq!(arr.argument(ValueRef::var("a")), ValueRef::var("a"));
    }
}
