//! C declarators and expressions.

use xcheck_ir::{Opaque, ParamType, Type, ValueRef};

/// Declaration of `name` with type `ty`; an empty name gives the
/// abstract declarator.
#[must_use]
pub fn declare(ty: &Type, name: &str) -> String {
    match ty {
        Type::Scalar(kind) => join(kind.c_name(), name),
        Type::Record { kind, name: tag } => join(&format!("{} {tag}", kind.keyword()), name),
        Type::Pointer(inner) => {
            let decl = if matches!(**inner, Type::Array { .. }) {
                format!("(*{name})")
            } else {
                format!("*{name}")
            };
            declare(inner, &decl)
        }
        Type::Array { elem, len } => declare(elem, &format!("{name}[{len}]")),
        Type::Opaque(Opaque::Void) => join("void", name),
        // function pointers are passed around under one generic prototype
        Type::Opaque(Opaque::Function) => format!("void ({name})(void)"),
    }
}

fn join(base: &str, decl: &str) -> String {
    if decl.is_empty() {
        base.to_string()
    } else {
        format!("{base} {decl}")
    }
}

/// Parameter type of an external routine.
#[must_use]
pub fn param(ty: &ParamType) -> String {
    match ty {
        ParamType::Value(ty) => declare(ty, ""),
        ParamType::Opaque => "const void *".to_string(),
        ParamType::Depth => "size_t".to_string(),
    }
}

/// C expression for `value`; the returned value is the `ret` macro
/// parameter.
#[must_use]
pub fn c_value(value: &ValueRef) -> String {
    match value {
        ValueRef::Var(name) => name.clone(),
        ValueRef::ReturnValue => "(ret)".to_string(),
        ValueRef::Field {
            base,
            field,
            through_pointer,
        } => {
            let op = if *through_pointer { "->" } else { "." };
            match **base {
                ValueRef::AddrOf(_) | ValueRef::Deref(_) => {
                    format!("({}){op}{field}", c_value(base))
                }
                _ => format!("{}{op}{field}", c_value(base)),
            }
        }
        ValueRef::AddrOf(inner) => format!("&{}", c_value(inner)),
        ValueRef::Deref(inner) => format!("*{}", c_value(inner)),
    }
}

pub(crate) fn u64_literal(value: u64) -> String {
    format!("UINT64_C({value:#x})")
}
