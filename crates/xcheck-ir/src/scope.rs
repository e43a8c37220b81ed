//! Names visible at a check point.

use crate::decl::{FunctionDecl, RecordDecl, TranslationUnit};
use crate::types::Type;
use crate::value::ValueRef;

/// Name of the routine parameter inside record hash routines.
pub const RECORD_PARAM: &str = "x";

/// A named value and its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopedValue {
    pub value: ValueRef,
    pub ty: Type,
}

/// Lexical scope of a check point. Later bindings shadow earlier ones.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    entries: Vec<(String, ScopedValue)>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: ValueRef, ty: Type) {
        self.entries.push((name.into(), ScopedValue { value, ty }));
    }

    /// Globals, then parameters, then locals of `func`.
    #[must_use]
    pub fn for_function(unit: &TranslationUnit, func: &FunctionDecl) -> Self {
        let mut scope = Self::new();
        for var in unit.globals.iter().chain(&func.params).chain(&func.locals) {
            scope.bind(&var.name, ValueRef::var(&var.name), var.ty.clone());
        }
        scope
    }

    /// Fields of `record`, reached through the routine's pointer parameter.
    #[must_use]
    pub fn for_record(record: &RecordDecl) -> Self {
        let mut scope = Self::new();
        for field in &record.fields {
            scope.bind(
                &field.name,
                ValueRef::arrow(ValueRef::var(RECORD_PARAM), &field.name),
                field.ty.clone(),
            );
        }
        scope
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ScopedValue> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.lookup(name).map(|v| &v.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::VarDecl;
    use xcheck_hash::ScalarKind;

    #[test]
    fn test_params_shadow_globals() {
        let mut unit = TranslationUnit::new("a.c");
        unit.globals.push(VarDecl::new("n", ScalarKind::U8.into()));
        let func = FunctionDecl::new(
            "f",
            vec![VarDecl::new("n", ScalarKind::I64.into())],
            None,
        );
        let scope = Scope::for_function(&unit, &func);
        assert_eq!(scope.type_of("n"), Some(&Type::Scalar(ScalarKind::I64)));
        assert!(scope.lookup("missing").is_none());
    }

    #[test]
    fn test_record_scope_uses_arrow() {
        let rec = RecordDecl::new("Foo", vec![VarDecl::new("a", ScalarKind::I32.into())]);
        let scope = Scope::for_record(&rec);
        let a = scope.lookup("a").unwrap();
        assert_eq!(a.value.to_string(), "x->a");
    }
}
