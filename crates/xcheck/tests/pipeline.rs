use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use xcheck::{
    CheckPoint, EngineOptions, Error, Severity, XCheck, function_decl, instrument, load_config,
    load_unit, resolve,
};

const UNIT: &str = r#"
file = "struct1.c"

[[records]]
name = "Foo"
fields = [{ name = "a", type = "int" }]

[[functions]]
name = "foo"
params = [{ name = "x", type = "struct Foo" }]
return = "int"

[[functions]]
name = "bar"
params = [
    { name = "n", type = "int", annotations = ["cross_check: { fixed = 7 }"] },
    { name = "p", type = "int*" },
]

[[functions]]
name = "main"
return = "int"
locals = [{ name = "x", type = "struct Foo" }]
"#;

const BASE: &str = r#"
[["struct1.c"]]
item = "defaults"
disable_xchecks = true

[["struct1.c"]]
item = "function"
name = "foo"
disable_xchecks = false
"#;

const OVERRIDE: &str = r#"
[["struct1.c"]]
item = "function"
name = "foo"
args = { x = { custom = "hash_foo(&x, y)" } }

[["struct1.c"]]
item = "function"
name = "bar"
entry = "default"
"#;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_instrument_writes_header() {
    let dir = tempfile::tempdir().unwrap();
    let unit_path = write(dir.path(), "struct1.unit.toml", UNIT);
    let config = write(dir.path(), "base.toml", BASE);

    let store = load_config(&[config]).unwrap();
    let unit = load_unit(&unit_path).unwrap();
    let out = instrument(&store, &unit, dir.path().join("out"), &EngineOptions::default())
        .unwrap();

    assert_eq!(out.header, dir.path().join("out/struct1_xcheck.h"));
    assert_eq!(out.summary.functions, 3);
    // foo is re-enabled; bar keeps only its annotated argument
    assert_eq!(out.summary.checks, 5);
    assert!(out.diagnostics.is_empty());

    let header = fs::read_to_string(&out.header).unwrap();
    assert!(header.contains("        rb_xcheck(3, __xcheck_hash_struct_Foo(&x, 8)); \\"));
    assert!(header.contains("#define XCHECK_ENTRY_main() do { \\\n    } while (0)\n"));
    assert!(header.contains(
        "#define XCHECK_ENTRY_bar() do { \\\n        rb_xcheck(3, UINT64_C(0x7)); \\\n    } while (0)\n"
    ));
}

#[test]
fn test_later_config_files_override() {
    let dir = tempfile::tempdir().unwrap();
    let unit_path = write(dir.path(), "struct1.unit.toml", UNIT);
    let base = write(dir.path(), "base.toml", BASE);
    let over = write(dir.path(), "override.toml", OVERRIDE);

    let store = load_config(&[base, over]).unwrap();
    let unit = load_unit(&unit_path).unwrap();
    let out = instrument(&store, &unit, dir.path(), &EngineOptions::default()).unwrap();

    // `y` is not in scope of `foo`, so only its argument check is lost
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Error);
    assert!(out.has_errors());
    assert_eq!(out.summary.checks, 5);

    let header = fs::read_to_string(&out.header).unwrap();
    assert!(!header.contains("hash_foo"));
    assert!(header.contains("#define XCHECK_ENTRY_bar() do { \\\n        rb_xcheck(1, "));
}

#[test]
fn test_resolve_uses_unit_annotations() {
    let dir = tempfile::tempdir().unwrap();
    let unit_path = write(dir.path(), "struct1.unit.toml", UNIT);
    let base = write(dir.path(), "base.toml", BASE);
    let store = load_config(&[base]).unwrap();
    let unit = load_unit(&unit_path).unwrap();
    let options = EngineOptions::default();

    let bar = function_decl(Some(&unit), "bar").unwrap();
    let n = resolve(&store, &options, "struct1.c", &bar, &CheckPoint::Argument("n".into()));
    assert_eq!(n.unwrap(), XCheck::Fixed(7));
    let p = resolve(&store, &options, "struct1.c", &bar, &CheckPoint::Argument("p".into()));
    assert_eq!(p.unwrap(), XCheck::Disabled);

    let bare = function_decl(None, "bar").unwrap();
    let n = resolve(&store, &options, "struct1.c", &bare, &CheckPoint::Argument("n".into()));
    assert_eq!(n.unwrap(), XCheck::Disabled);

    let foo = function_decl(Some(&unit), "foo").unwrap();
    let entry = resolve(&store, &options, "struct1.c", &foo, &CheckPoint::Entry);
    assert_eq!(entry.unwrap(), XCheck::Default);
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(
        dir.path(),
        "bad.toml",
        "[[\"a.c\"]]\nitem = \"function\"\nname = \"f\"\nentry = \"sometimes\"\n",
    );
    assert!(matches!(load_config(&[bad]), Err(Error::Config(_))));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(load_config(&[missing]), Err(Error::Config(_))));

    let unit = write(
        dir.path(),
        "u.toml",
        "file = \"a.c\"\n[[functions]]\nname = \"f\"\n[[functions]]\nname = \"f\"\n",
    );
    assert!(matches!(load_unit(&unit), Err(Error::Unit(_))));
}
