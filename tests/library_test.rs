//! Library-level integration tests exercising the public `check`/`run_source`
//! surface end to end, across lexer → parser → analyzer → interpreter. Tests
//! that need to observe *printed* output live in `cli_tests.rs` instead,
//! since `print`/`println` write straight to the process's real stdout.

use willow_lang::diagnostic::DiagnosticKind;
use willow_lang::error::RuntimeErrorKind;
use willow_lang::native::{NativeCallable, NativeModuleTable};
use willow_lang::{check, run_source};

#[test]
fn clean_source_has_no_diagnostics() {
    let diags = check("x = 1\nprintln(x)\n", "main.willow");
    assert!(diags.is_empty());
}

#[test]
fn check_reports_lexer_analyzer_and_syntax_diagnostics_distinctly() {
    let syntax = check("print(1\n", "main.willow");
    assert_eq!(syntax.len(), 1);
    assert_eq!(syntax[0].kind, DiagnosticKind::Syntax);

    let semantic = check("println(undefined_name)\n", "main.willow");
    assert_eq!(semantic.len(), 1);
    assert_eq!(semantic[0].kind, DiagnosticKind::Semantic);
}

#[test]
fn runtime_division_by_zero_is_reported_through_run_source() {
    let table = NativeModuleTable::new();
    let result = run_source("x = 1 / 0\n", "main.willow", &table);
    match result {
        Ok(diags) => panic!("expected a runtime error, got diagnostics: {diags:?}"),
        Err(e) => assert_eq!(e.kind, RuntimeErrorKind::DivisionByZero),
    }
}

#[test]
fn stack_trace_innermost_first_on_uncaught_index_error() {
    let table = NativeModuleTable::new();
    let src = r#"
function c() do
    items = [1, 2]
    return items[5]
end
function b() do
    return c()
end
function a() do
    return b()
end
a()
"#;
    let err = run_source(src, "main.willow", &table).unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::IndexOutOfRange { .. }));
    let frames: Vec<&str> = err.trace().iter().map(|f| f.context.as_str()).collect();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].contains("'c'"));
    assert!(frames[1].contains("'b'"));
    assert!(frames[2].contains("'a'"));
}

#[test]
fn try_except_catches_runtime_error_and_binds_message_line_col() {
    let table = NativeModuleTable::new();
    let src = r#"
result = 0
try do
    result = 1 / 0
except e do
    result = e["line"]
end
println(result)
"#;
    // running to completion (no panic / no propagated error) is the assertion;
    // println's actual stdout is covered by the CLI-level test suite.
    assert!(run_source(src, "main.willow", &table).unwrap().is_empty());
}

#[test]
fn import_cycle_terminates_at_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let a_path = dir.path().join("a.willow");
    let b_path = dir.path().join("b.willow");
    std::fs::write(&a_path, "import \"b\"\nfunction fa() do return 1 end\n").unwrap();
    std::fs::write(&b_path, "import \"a\"\nfunction fb() do return 2 end\n").unwrap();

    let source = std::fs::read_to_string(&a_path).unwrap();
    let table = NativeModuleTable::new();
    let result = run_source(&source, &a_path, &table);
    assert!(result.is_ok(), "import cycle should not hang or error: {result:?}");
}

#[test]
fn native_module_table_is_reachable_from_source() {
    let mut table = NativeModuleTable::new();
    table.register(
        "mathx",
        vec![(
            "double",
            NativeCallable::new("double", |args| match args {
                [willow_lang::value::Value::Int(n)] => Ok(willow_lang::value::Value::Int(n * 2)),
                _ => Err(RuntimeErrorKind::arity_mismatch("mathx.double", "1", args.len())),
            }),
        )],
    );
    let src = "import \"mathx\"\nresult = mathx.double(21)\n";
    let diags = run_source(src, "main.willow", &table).unwrap();
    assert!(diags.is_empty());
}

/// §4.4: negative indices wrap around on both read and write, but a write
/// target out of `[-len, len)` is still a range error.
#[test]
fn negative_index_wraps_on_read_and_write() {
    let table = NativeModuleTable::new();
    let read_ok = run_source("xs = [1, 2, 3]\nprintln(xs[-1])\n", "main.willow", &table);
    assert!(read_ok.unwrap().is_empty());

    let write_ok = run_source("xs = [1, 2, 3]\nxs[-1] = 9\nif xs[2] != 9 then\n    x = 1 / 0\nend\n", "main.willow", &table);
    assert!(write_ok.unwrap().is_empty());

    let write_err = run_source("xs = [1, 2, 3]\nxs[-4] = 9\n", "main.willow", &table);
    let err = write_err.unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::IndexOutOfRange { .. }));
}

#[test]
fn mapping_with_unhashable_key_is_a_runtime_error() {
    let table = NativeModuleTable::new();
    let result = run_source("m = {[1]: 2}\n", "main.willow", &table);
    let err = result.unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::UnhashableKey { .. }));
}

#[test]
fn analyzer_catches_wrong_arity_before_any_statement_runs() {
    let table = NativeModuleTable::new();
    // side effect (print) must never happen: analysis fails first.
    let src = "function f(a) do return a end\nprintln(\"side effect\")\nf(1, 2)\n";
    let diags = run_source(src, "main.willow", &table).unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::Semantic);
}

/// §8: "Truthiness is stable: for any value v, `not not v == (if v then true
/// else false)`." Each `assert` below only blows up (via a division by zero)
/// when the property fails, so a clean run is the assertion.
#[test]
fn truthiness_is_stable_across_representative_values() {
    let table = NativeModuleTable::new();
    let src = r#"
function assert(cond) do
    if not cond then
        x = 1 / 0
    end
end

function as_bool(v) do
    if v then
        return true
    else
        return false
    end
end

values = [0, 1, -1, 0.0, 2.5, "", "a", [], [1], {}, true, false]
for v in values do
    assert((not (not v)) == as_bool(v))
end
"#;
    let result = run_source(src, "main.willow", &table).unwrap();
    assert!(result.is_empty());
}

/// §8: "for numeric v, `to_int(to_str(v)) == v` when v is an integer."
#[test]
fn to_str_then_to_int_round_trips_for_integers() {
    let table = NativeModuleTable::new();
    let src = r#"
function assert(cond) do
    if not cond then
        x = 1 / 0
    end
end

values = [0, 1, -1, 42, -1000]
for v in values do
    assert(to_int(to_str(v)) == v)
end
"#;
    let result = run_source(src, "main.willow", &table).unwrap();
    assert!(result.is_empty());
}

/// §8: "`type(v)` is one of the fixed set."
#[test]
fn type_tag_is_always_one_of_the_fixed_set() {
    let table = NativeModuleTable::new();
    let src = r#"
function assert(cond) do
    if not cond then
        x = 1 / 0
    end
end

function is_known_tag(t) do
    known = ["int", "float", "str", "bool", "list", "dict", "function", "unknown"]
    for k in known do
        if k == t then
            return true
        end
    end
    return false
end

function f() do return 1 end
class C do function __main__(self) do self.__x = 1 end end

values = [1, 1.5, "s", true, [1], {"a": 1}, f]
for v in values do
    assert(is_known_tag(type(v)))
end
assert(is_known_tag(type(C())))
"#;
    let result = run_source(src, "main.willow", &table).unwrap();
    assert!(result.is_empty());
}

/// §8: "Defining `__eq__` on a class causes `==` to delegate; otherwise `==`
/// on two distinct instances is `false`."
#[test]
fn eq_dunder_delegates_and_default_equality_is_identity() {
    let table = NativeModuleTable::new();
    let src = r#"
function assert(cond) do
    if not cond then
        x = 1 / 0
    end
end

class AlwaysEqual do
    function __main__(self) do end
    function __eq__(self, other) do return true end
end

class Plain do
    function __main__(self) do end
end

assert(AlwaysEqual() == AlwaysEqual())
assert(not (Plain() == Plain()))
p = Plain()
assert(p == p)
"#;
    let result = run_source(src, "main.willow", &table).unwrap();
    assert!(result.is_empty());
}
