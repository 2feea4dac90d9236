//! End-to-end tests: source text in, printed output or error out.

use lark_vm::{InterpretError, RuntimeError, Vm, VmError};
use proptest::prelude::*;

fn run(source: &str) -> Result<String, InterpretError> {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    let result = vm.interpret(source);
    drop(vm);
    result.map(|()| String::from_utf8(out).expect("utf8 output"))
}

fn run_ok(source: &str) -> String {
    run(source).expect("program should run")
}

fn runtime_err(source: &str) -> VmError {
    match run(source) {
        Err(InterpretError::Runtime(error)) => error,
        other => panic!("expected runtime error, got {other:?}"),
    }
}

// ============================================================
// Expressions and printing
// ============================================================

#[test]
fn arithmetic_and_number_display() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
    assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
    assert_eq!(run_ok("print 5 / 2;"), "2.5\n");
    assert_eq!(run_ok("print -4;"), "-4\n");
}

#[test]
fn division_by_zero_is_ieee() {
    assert_eq!(run_ok("print 1 / 0;"), "inf\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
}

#[test]
fn concatenated_strings_compare_equal_to_literals() {
    assert_eq!(run_ok("print \"a\" + \"b\" == \"ab\";"), "true\n");
}

#[test]
fn comparisons_and_equality() {
    assert_eq!(run_ok("print 1 < 2;"), "true\n");
    assert_eq!(run_ok("print 2 <= 1;"), "false\n");
    assert_eq!(run_ok("print 1 == 1;"), "true\n");
    assert_eq!(run_ok("print 1 != nil;"), "true\n");
    assert_eq!(run_ok("print nil == nil;"), "true\n");
}

#[test]
fn not_and_falsiness() {
    assert_eq!(run_ok("print !nil;"), "true\n");
    assert_eq!(run_ok("print !0;"), "false\n");
    assert_eq!(run_ok("print !false;"), "true\n");
}

#[test]
fn and_or_yield_operand_values() {
    assert_eq!(run_ok("print nil and 1;"), "nil\n");
    assert_eq!(run_ok("print 1 and 2;"), "2\n");
    assert_eq!(run_ok("print nil or \"x\";"), "x\n");
    assert_eq!(run_ok("print 1 or 2;"), "1\n");
}

#[test]
fn add_type_mismatch() {
    assert_eq!(
        runtime_err("print \"x\" + 1;").error,
        RuntimeError::AddTypeMismatch
    );
}

#[test]
fn subtract_requires_numbers() {
    assert_eq!(
        runtime_err("print \"x\" - 1;").error,
        RuntimeError::OperandsMustBeNumbers
    );
}

#[test]
fn negate_requires_number() {
    assert_eq!(
        runtime_err("print -\"x\";").error,
        RuntimeError::OperandMustBeNumber
    );
}

// ============================================================
// Variables and scope
// ============================================================

#[test]
fn multi_declaration_sum() {
    assert_eq!(run_ok("var x = 1, y = 2; print x + y;"), "3\n");
}

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(run_ok("var x; print x;"), "nil\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(run_ok("var x; print x = 5;"), "5\n");
}

#[test]
fn locals_shadow_globals() {
    assert_eq!(
        run_ok("var x = \"global\"; { var x = \"local\"; print x; } print x;"),
        "local\nglobal\n"
    );
}

#[test]
fn undefined_global_read() {
    assert_eq!(
        runtime_err("print missing;").error,
        RuntimeError::UndefinedVariable {
            name: "missing".to_string()
        }
    );
}

#[test]
fn assignment_to_undeclared_global() {
    let error = runtime_err("missing = 1;").error;
    assert_eq!(
        error,
        RuntimeError::UndefinedVariable {
            name: "missing".to_string()
        }
    );
    // And the failed assignment must not have created the global.
    assert_eq!(
        runtime_err("missing = 1; print missing;").error,
        RuntimeError::UndefinedVariable {
            name: "missing".to_string()
        }
    );
}

#[test]
fn globals_persist_across_interpret_calls() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    vm.interpret("var x = 1;").expect("first line");
    vm.interpret("var x = x + 1;").expect("redefinition");
    vm.interpret("print x;").expect("third line");
    drop(vm);
    assert_eq!(String::from_utf8(out).expect("utf8"), "2\n");
}

// ============================================================
// Control flow
// ============================================================

#[test]
fn if_else_takes_the_right_branch() {
    assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(run_ok("if (1 > 2) print \"yes\"; else print \"no\";"), "no\n");
}

#[test]
fn while_loop_counts() {
    assert_eq!(
        run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_with_all_clauses() {
    assert_eq!(
        run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_sum() {
    assert_eq!(
        run_ok("var s = 0; for (var i = 1; i <= 10; i = i + 1) s = s + i; print s;"),
        "55\n"
    );
}

// ============================================================
// Functions
// ============================================================

#[test]
fn function_call_and_return() {
    assert_eq!(
        run_ok("fun add(a, b) { return a + b; } print add(2, 3);"),
        "5\n"
    );
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
}

#[test]
fn recursive_fibonacci() {
    let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 2) + fib(n - 1);
}
print fib(10);
";
    assert_eq!(run_ok(source), "55\n");
}

#[test]
fn function_values_print() {
    assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run_ok("print clock;"), "<native fn>\n");
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run_ok("print clock() >= 0;"), "true\n");
}

#[test]
fn arity_mismatch() {
    assert_eq!(
        runtime_err("fun f(a) { return a; } f(1, 2);").error,
        RuntimeError::ArityMismatch {
            expected: 1,
            got: 2
        }
    );
}

#[test]
fn calling_a_number_fails() {
    // Rebinding a function name to a number still parses as a call.
    assert_eq!(
        runtime_err("fun f() {} f = 3; f();").error,
        RuntimeError::NotCallable
    );
}

#[test]
fn unbounded_recursion_overflows() {
    assert_eq!(
        runtime_err("fun f() { f(); } f();").error,
        RuntimeError::StackOverflow
    );
}

#[test]
fn runtime_trace_lists_frames_innermost_first() {
    let source = "\
fun a() { return \"x\" - 1; }
fun b() { return a(); }
b();
";
    let error = runtime_err(source);
    assert_eq!(error.error, RuntimeError::OperandsMustBeNumbers);
    assert_eq!(error.trace.len(), 3);
    assert!(error.trace[0].contains("in a()"));
    assert!(error.trace[1].contains("in b()"));
    assert!(error.trace[2].contains("in script"));
    assert!(error.trace[0].starts_with("[line 1]"));
}

// ============================================================
// The ? random operator
// ============================================================

#[test]
fn random_result_is_within_inclusive_bounds() {
    for _ in 0..50 {
        let output = run_ok("print 1 ? 6;");
        let value: f64 = output.trim().parse().expect("numeric output");
        assert!((1.0..=6.0).contains(&value));
        assert_eq!(value.fract(), 0.0);
    }
}

#[test]
fn random_accepts_reversed_bounds() {
    let output = run_ok("print 6 ? 1;");
    let value: f64 = output.trim().parse().expect("numeric output");
    assert!((1.0..=6.0).contains(&value));
}

#[test]
fn random_equal_bounds_is_deterministic() {
    assert_eq!(run_ok("print 4 ? 4;"), "4\n");
}

#[test]
fn random_binds_at_multiplication_tier() {
    // (5 ? 5) * 2, never a draw from [5, 10].
    for _ in 0..50 {
        assert_eq!(run_ok("print 5 ? 5 * 2;"), "10\n");
    }
}

#[test]
fn random_requires_numbers() {
    assert_eq!(
        runtime_err("print \"a\" ? 6;").error,
        RuntimeError::RandomOperandsMustBeNumbers
    );
}

proptest! {
    #[test]
    fn random_stays_in_bounds(a in -100i32..100, b in -100i32..100) {
        let source = format!("print {a} ? {b};");
        let output = run_ok(&source);
        let value: f64 = output.trim().parse().expect("numeric output");
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(value >= lo as f64 && value <= hi as f64);
        prop_assert_eq!(value.fract(), 0.0);
    }
}

// ============================================================
// Arrays
// ============================================================

#[test]
fn array_elements_default_to_nil() {
    assert_eq!(run_ok("var a(3); print a(2);"), "nil\n");
}

#[test]
fn array_set_get_and_sum() {
    let source = "\
var a(1:3);
a(1) = 5;
a(2) = 7;
a(3) = 8;
print a(1) + a(2) + a(3);
";
    assert_eq!(run_ok(source), "20\n");
}

#[test]
fn array_assignment_is_an_expression() {
    assert_eq!(run_ok("var a(3); print a(2) = 9;"), "9\n");
}

#[test]
fn custom_bounds_index_by_subscript() {
    assert_eq!(
        run_ok("var a(3:5); a(3) = 1; a(5) = 2; print a(3) + a(5);"),
        "3\n"
    );
}

#[test]
fn subscript_below_bounds() {
    let error = runtime_err("var a(3:5); print a(2);").error;
    assert_eq!(
        error.to_string(),
        "Subscript value 2 is not in array bounds between 3 and 5."
    );
}

#[test]
fn subscript_above_bounds() {
    let error = runtime_err("var a(3:5); a(6) = 1;").error;
    assert_eq!(
        error.to_string(),
        "Subscript value 6 is not in array bounds between 3 and 5."
    );
}

#[test]
fn wildcard_assignment_fills_every_element() {
    assert_eq!(
        run_ok("var a(3); a(*) = 7; print a(1) + a(2) + a(3);"),
        "21\n"
    );
}

#[test]
fn wildcard_read_is_a_runtime_error() {
    let error = runtime_err("var a(3); print a(*);").error;
    assert_eq!(
        error.to_string(),
        "Wildcard subscript is not allowed when reading an array."
    );
}

#[test]
fn two_dimensional_array() {
    let source = "\
var m(1:2, 1:3);
m(1, 2) = 10;
m(2, 2) = 20;
print m(1, 2) + m(2, 2);
print m(2, 3);
";
    assert_eq!(run_ok(source), "30\nnil\n");
}

#[test]
fn wildcard_on_one_axis_of_two() {
    let source = "\
var m(1:2, 1:3);
m(1, *) = 1;
print m(1, 1) + m(1, 2) + m(1, 3);
print m(2, 1);
";
    assert_eq!(run_ok(source), "3\nnil\n");
}

#[test]
fn subscript_count_mismatch() {
    let error = runtime_err("var m(1:2, 1:3); print m(1);").error;
    assert_eq!(error.to_string(), "Expected 2 subscripts but got 1.");
}

#[test]
fn non_numeric_subscript() {
    let error = runtime_err("var a(3); print a(\"x\");").error;
    assert_eq!(error.to_string(), "Array subscript must be a number.");
}

#[test]
fn undefined_array_variable() {
    assert_eq!(
        runtime_err("print z(1);").error,
        RuntimeError::UndefinedArray {
            name: "z".to_string()
        }
    );
}

#[test]
fn negative_bounds_work_end_to_end() {
    assert_eq!(
        run_ok("var a(-3:-1); a(-2) = 5; print a(-2);"),
        "5\n"
    );
}

#[test]
fn subscript_expression_is_evaluated() {
    assert_eq!(run_ok("var a(5); a(2 + 2) = 9; print a(4);"), "9\n");
}
