//! Header generation.
//!
//! The header contains, in order:
//! - the runtime prototype, pointer/record sentinels and the inline hashers
//! - prototypes of external routines called by checks
//! - prototypes and bodies of the synthesized hash routines
//! - the entry and exit macros of every instrumented function

use std::fmt::Write;

use xcheck_hash::{
    HasherKind, JODY_HASH_CONSTANT, JODY_HASH_SHIFT, LEAF_POINTER_HASH, LEAF_RECORD_HASH,
    NULL_POINTER_HASH, POINTER_HASH, ScalarKind,
};
use xcheck_ir::{
    ArgPassing, CheckCall, CheckSite, CheckValue, FieldHash, HashFunction, HashRoutine,
    RECORD_PARAM, RoutineBody, ValueRef,
};

use crate::host::CHost;
use crate::syntax::{c_value, declare, param, u64_literal};

/// Runtime entry point receiving every fingerprint.
pub const RUNTIME_FN: &str = "rb_xcheck";

/// Render the instrumentation header of `host`'s unit.
#[must_use]
pub fn gen_header(host: &CHost<'_>) -> String {
    let mut s = String::new();
    s.push_str(&gen_prelude(&host.unit().file));
    s.push_str(&gen_externs(host));
    s.push_str(&gen_routines(host.routines()));
    s.push_str(&gen_macros(host));
    s
}

fn update_fn(kind: HasherKind) -> String {
    format!("__xcheck_{}_update", kind.name())
}

fn gen_prelude(file: &str) -> String {
    let k = u64_literal(JODY_HASH_CONSTANT);
    let shift = JODY_HASH_SHIFT;
    let back = 64 - JODY_HASH_SHIFT;
    format!(
        r#"/* Cross-check instrumentation for {file}. Generated, do not edit. */
#pragma once
#include <stdint.h>
#include <stddef.h>

extern void {RUNTIME_FN}(uint8_t tag, uint64_t value);

#define XCHECK_NULL_POINTER_HASH {null}
#define XCHECK_LEAF_POINTER_HASH {leaf_ptr}
#define XCHECK_POINTER_HASH {ptr}
#define XCHECK_LEAF_RECORD_HASH {leaf_rec}

static inline uint64_t {jody}(uint64_t h, uint64_t v) {{
    h = h + v + {k};
    h = (h << {shift}) | (h >> {back});
    h ^= v;
    h = (h << {shift}) | (h >> {back});
    h ^= {k};
    return h + v;
}}

static inline uint64_t {simple}(uint64_t h, uint64_t v) {{
    return h ^ v;
}}

"#,
        null = u64_literal(NULL_POINTER_HASH),
        leaf_ptr = u64_literal(LEAF_POINTER_HASH),
        ptr = u64_literal(POINTER_HASH),
        leaf_rec = u64_literal(LEAF_RECORD_HASH),
        jody = update_fn(HasherKind::Jodyhash),
        simple = update_fn(HasherKind::Simple),
    )
}

fn gen_externs(host: &CHost<'_>) -> String {
    if host.externs().is_empty() {
        return String::new();
    }
    let mut s = String::from("/* User-provided check functions */\n");
    for (name, sig) in host.externs() {
        let params = if sig.params.is_empty() {
            "void".to_string()
        } else {
            sig.params.iter().map(param).collect::<Vec<_>>().join(", ")
        };
        let _ = writeln!(s, "extern uint64_t {name}({params});");
    }
    s.push('\n');
    s
}

fn routine_signature(func: &HashFunction) -> String {
    format!(
        "static inline uint64_t {}({}, size_t depth)",
        func.full_name(),
        declare(&func.actual_ty, RECORD_PARAM)
    )
}

/// `arg` converted to the parameter type of `func`. Function pointers
/// need an explicit cast to the generic prototype.
fn coerce(func: &HashFunction, arg: String) -> String {
    if func.actual_ty.mentions_function() {
        format!("({})({arg})", declare(&func.actual_ty, ""))
    } else {
        arg
    }
}

/// Argument handing the object designated by `object` to `func`.
fn pass(func: &HashFunction, object: &str) -> String {
    let arg = match func.passing() {
        ArgPassing::Value | ArgPassing::Decay => object.to_string(),
        ArgPassing::Address => format!("&{object}"),
    };
    coerce(func, arg)
}

fn gen_routines(routines: &[HashRoutine]) -> String {
    if routines.is_empty() {
        return String::new();
    }
    let mut s = String::from("/* Hash routines */\n");
    for routine in routines {
        let _ = writeln!(s, "{};", routine_signature(&routine.func));
    }
    s.push('\n');
    for routine in routines {
        s.push_str(&gen_routine(routine));
        s.push('\n');
    }
    s
}

fn gen_scalar_body(kind: ScalarKind) -> String {
    let seed = u64_literal(kind.seed());
    let bits = match kind {
        ScalarKind::F32 => {
            "    union { float f; uint32_t u; } bits = { .f = x };\n    (void)depth;\n"
        }
        ScalarKind::F64 => {
            "    union { double f; uint64_t u; } bits = { .f = x };\n    (void)depth;\n"
        }
        _ => "    (void)depth;\n",
    };
    let value = if kind.is_float() { "bits.u" } else { "x" };
    format!("{bits}    return {seed} ^ (uint64_t){value};\n")
}

fn field_value(field: &FieldHash) -> String {
    match field {
        FieldHash::Routine { field, routine } => format!(
            "{}({}, depth - 1)",
            routine.full_name(),
            pass(routine, &format!("x->{field}"))
        ),
        FieldHash::FieldHasher { field, function } => format!("{function}(&x->{field}, depth - 1)"),
        FieldHash::Const { value, .. } => u64_literal(*value),
        FieldHash::Custom { function, args, .. } => call_expr(function, args),
    }
}

fn call_expr(function: &str, args: &[ValueRef]) -> String {
    let args: Vec<String> = args.iter().map(c_value).collect();
    format!("{function}({})", args.join(", "))
}

fn gen_routine(routine: &HashRoutine) -> String {
    let body = match &routine.body {
        RoutineBody::Scalar(kind) => gen_scalar_body(*kind),
        RoutineBody::Pointer { pointee } => {
            let object = match pointee.passing() {
                ArgPassing::Address => "x".to_string(),
                ArgPassing::Value | ArgPassing::Decay => "*x".to_string(),
            };
            format!(
                "    if (x == NULL) return XCHECK_NULL_POINTER_HASH;\n    \
                 if (depth == 0) return XCHECK_LEAF_POINTER_HASH;\n    \
                 return XCHECK_POINTER_HASH ^ {}({object}, depth - 1);\n",
                pointee.full_name()
            )
        }
        RoutineBody::OpaquePointer => "    (void)depth;\n    \
             return x == NULL ? XCHECK_NULL_POINTER_HASH : XCHECK_LEAF_POINTER_HASH;\n"
            .to_string(),
        RoutineBody::Array {
            element,
            len,
            aggregate,
        } => format!(
            "    uint64_t h = 0;\n    \
             for (size_t i = 0; i < {len}; i++) {{\n        \
             h = {}(h, {}({}, depth));\n    \
             }}\n    \
             return h;\n",
            update_fn(*aggregate),
            element.full_name(),
            pass(element, "x[i]")
        ),
        RoutineBody::Record { hashers, fields } => {
            let mut s = String::from(
                "    uint64_t h = 0;\n    (void)x;\n    \
                 if (depth == 0) return XCHECK_LEAF_RECORD_HASH;\n",
            );
            for field in fields {
                let _ = writeln!(
                    s,
                    "    h = {}(h, {}(0, {}));",
                    update_fn(hashers.aggregate),
                    update_fn(hashers.simple),
                    field_value(field)
                );
            }
            s.push_str("    return h;\n");
            s
        }
        RoutineBody::CustomRecord { function } => format!("    return {function}(x, depth);\n"),
        RoutineBody::Opaque => {
            "    (void)x;\n    (void)depth;\n    return XCHECK_LEAF_RECORD_HASH;\n".to_string()
        }
    };
    format!("{} {{\n{body}}}\n", routine_signature(&routine.func))
}

fn call_statement(call: &CheckCall) -> String {
    let value = match &call.value {
        CheckValue::Const(k) => u64_literal(*k),
        CheckValue::Hash {
            routine,
            arg,
            depth,
        } => format!(
            "{}({}, {depth})",
            routine.full_name(),
            coerce(routine, c_value(arg))
        ),
        CheckValue::Custom { function, args } => call_expr(function, args),
    };
    format!("{RUNTIME_FN}({}, {value});", call.tag.value())
}

fn gen_macro(head: &str, calls: &[CheckCall]) -> String {
    let mut s = format!("#define {head} do {{ \\\n");
    for call in calls {
        let _ = writeln!(s, "        {} \\", call_statement(call));
    }
    s.push_str("    } while (0)\n");
    s
}

fn gen_macros(host: &CHost<'_>) -> String {
    let mut s = String::from("/* Check points */\n");
    for func in host.functions() {
        let entry = host.calls_at(&CheckSite::entry(&func.name));
        let exit = host.calls_at(&CheckSite::exit(&func.name));
        s.push_str(&gen_macro(&format!("XCHECK_ENTRY_{}()", func.name), entry));
        s.push_str(&gen_macro(&format!("XCHECK_EXIT_{}(ret)", func.name), exit));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcheck_config::{Config, ConfigStore};
    use xcheck_ir::{FunctionDecl, RecordDecl, TranslationUnit, Type, VarDecl};
    use xcheck_synth::{EngineOptions, instrument_unit};

    fn int() -> Type {
        ScalarKind::I32.into()
    }

    fn struct1() -> TranslationUnit {
        let mut unit = TranslationUnit::new("struct1.c");
        unit.records
            .push(RecordDecl::new("Foo", vec![VarDecl::new("a", int())]));
        unit.functions.push(FunctionDecl::new(
            "foo",
            vec![VarDecl::new("x", Type::record("Foo"))],
            Some(int()),
        ));
        unit.functions
            .push(FunctionDecl::new("main", Vec::new(), Some(int())));
        unit
    }

    fn render(unit: &TranslationUnit, config: &str) -> String {
        let store = ConfigStore::ingest(Config::from_toml_str(config).unwrap()).unwrap();
        let mut host = CHost::new(unit);
        instrument_unit(&store, unit, &mut host, &EngineOptions::default());
        host.render()
    }

    #[test]
    fn test_struct_header() {
        let header = render(&struct1(), "");
        assert!(header.starts_with("/* Cross-check instrumentation for struct1.c."));
        assert!(header.contains("extern void rb_xcheck(uint8_t tag, uint64_t value);"));
        assert!(header.contains(
            "static inline uint64_t __xcheck_hash_struct_Foo(struct Foo *x, size_t depth);"
        ));
        assert!(header.contains(
            "    h = __xcheck_jodyhash_update(h, __xcheck_simple_update(0, \
             __xcheck_hash_int32_t(x->a, depth - 1)));"
        ));
        assert!(header.contains("    return UINT64_C(0x7878787878787876) ^ (uint64_t)x;"));

        let expected_foo = "\
#define XCHECK_ENTRY_foo() do { \\
        rb_xcheck(1, UINT64_C(0xb887389)); \\
        rb_xcheck(3, __xcheck_hash_struct_Foo(&x, 8)); \\
    } while (0)
#define XCHECK_EXIT_foo(ret) do { \\
        rb_xcheck(2, UINT64_C(0xb887389)); \\
        rb_xcheck(4, __xcheck_hash_int32_t((ret), 8)); \\
    } while (0)
";
        assert!(header.contains(expected_foo), "{header}");
        assert!(header.contains("#define XCHECK_ENTRY_main() do { \\\n        rb_xcheck(1, UINT64_C(0x7c9a7f6a)); \\\n"));
    }

    #[test]
    fn test_pointer_and_array_routines() {
        let mut unit = TranslationUnit::new("p.c");
        unit.records.push(RecordDecl::new(
            "Node",
            vec![
                VarDecl::new("xs", Type::array_of(ScalarKind::F32.into(), 4)),
                VarDecl::new("next", Type::pointer_to(Type::record("Node"))),
            ],
        ));
        unit.functions.push(FunctionDecl::new(
            "walk",
            vec![VarDecl::new("n", Type::pointer_to(Type::record("Node")))],
            None,
        ));
        let header = render(&unit, "");
        assert!(header.contains(
            "    return XCHECK_POINTER_HASH ^ __xcheck_hash_struct_Node(x, depth - 1);"
        ));
        assert!(header.contains(
            "static inline uint64_t __xcheck_hash_float_array_4(float *x, size_t depth)"
        ));
        assert!(header.contains("        h = __xcheck_jodyhash_update(h, __xcheck_hash_float(x[i], depth));"));
        assert!(header.contains("    union { float f; uint32_t u; } bits = { .f = x };"));
        assert!(header.contains("__xcheck_hash_float_array_4(x->xs, depth - 1)"));
        assert!(header.contains("__xcheck_hash_struct_Node_ptr(x->next, depth - 1)"));
        assert!(header.contains("#define XCHECK_EXIT_walk(ret) do { \\\n        rb_xcheck(2, "));
    }

    #[test]
    fn test_custom_functions_are_declared() {
        let unit = struct1();
        let header = render(
            &unit,
            r#"
            [["struct1.c"]]
            item = "function"
            name = "foo"
            args = { x = { custom = "hash_foo(&x)" } }
            exit_extra = [{ custom = "log_exit" }]

            [["struct1.c"]]
            item = "struct"
            name = "Foo"
            field_hasher = "hash_any"
            "#,
        );
        assert!(header.contains("/* User-provided check functions */\n"));
        assert!(header.contains("extern uint64_t hash_foo(struct Foo *);"));
        assert!(header.contains("extern uint64_t log_exit(void);"));
        assert!(header.contains("        rb_xcheck(3, hash_foo(&x)); \\"));
        assert!(header.contains("        rb_xcheck(2, log_exit()); \\"));
        // the record routine is never requested for `x`
        assert!(!header.contains("hash_any"));
    }

    #[test]
    fn test_opaque_and_custom_records() {
        let mut unit = TranslationUnit::new("o.c");
        unit.records
            .push(RecordDecl::new("Blob", vec![VarDecl::new("n", int())]));
        unit.functions.push(FunctionDecl::new(
            "f",
            vec![
                VarDecl::new("h", Type::pointer_to(Type::record("Handle"))),
                VarDecl::new("b", Type::record("Blob")),
            ],
            None,
        ));
        let header = render(
            &unit,
            r#"
            [["o.c"]]
            item = "struct"
            name = "Blob"
            custom_hash = "hash_blob"
            "#,
        );
        assert!(header.contains("extern uint64_t hash_blob(struct Blob *, size_t);"));
        assert!(header.contains("    return hash_blob(x, depth);\n"));
        assert!(header.contains(
            "static inline uint64_t __xcheck_hash_struct_Handle(struct Handle *x, size_t depth) {\n    \
             (void)x;\n    (void)depth;\n    return XCHECK_LEAF_RECORD_HASH;\n}\n"
        ));
    }

    #[test]
    fn test_void_and_function_pointers() {
        let mut unit = TranslationUnit::new("cb.c");
        unit.records.push(RecordDecl::new(
            "Handler",
            vec![
                VarDecl::new("cb", "int (*)(int)".parse().unwrap()),
                VarDecl::new("ctx", "void *".parse().unwrap()),
            ],
        ));
        unit.functions.push(FunctionDecl::new(
            "reg",
            vec![
                VarDecl::new("h", Type::record("Handler")),
                VarDecl::new("cb", "void (*)(void)".parse().unwrap()),
            ],
            None,
        ));
        let header = render(&unit, "");
        assert!(header.contains(
            "static inline uint64_t __xcheck_hash_fn_ptr(void (*x)(void), size_t depth) {\n    \
             (void)depth;\n    \
             return x == NULL ? XCHECK_NULL_POINTER_HASH : XCHECK_LEAF_POINTER_HASH;\n}\n"
        ));
        assert!(header.contains("static inline uint64_t __xcheck_hash_void_ptr(void *x, size_t depth);"));
        assert!(header.contains("__xcheck_hash_fn_ptr((void (*)(void))(x->cb), depth - 1)"));
        assert!(header.contains("__xcheck_hash_void_ptr(x->ctx, depth - 1)"));
        assert!(header.contains("        rb_xcheck(3, __xcheck_hash_fn_ptr((void (*)(void))(cb), 8)); \\"));
    }

    #[test]
    fn test_prelude_matches_hashers() {
        let prelude = gen_prelude("a.c");
        assert_eq!(
            prelude.lines().filter(|l| l.starts_with("#define XCHECK_")).count(),
            4
        );
        assert!(prelude.contains("    h = (h << 14) | (h >> 50);"));
        assert!(prelude.contains("#define XCHECK_POINTER_HASH UINT64_C(0x56414c4944505452)"));
    }
}
