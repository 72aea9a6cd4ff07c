// tau-vm - End-to-end evaluation tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use common::{compile_and_run, expect_error, run_in, run_ok};
use tau_core::Value;
use tau_vm::State;

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_globals_sum() {
    assert_eq!(run_ok("a = 1; b = 2; a + b"), Value::Int(3));
}

#[test]
fn test_functions_call_functions() {
    assert_eq!(
        run_ok("one = fn() { 1 }; two = fn() { one() + one() }; two()"),
        Value::Int(2)
    );
}

#[test]
fn test_for_loop_leaves_counter() {
    assert_eq!(run_ok("for i = 0; i < 5; i = i + 1 { }; i"), Value::Int(5));
}

#[test]
fn test_closure_captures_parameter() {
    assert_eq!(
        run_ok("make = fn(x) { fn() { x } }; f = make(10); f()"),
        Value::Int(10)
    );
}

#[test]
fn test_index_assignment_writes_through() {
    assert_eq!(run_ok("a = [1,2,3]; a[1] = 9; a[1]"), Value::Int(9));
}

#[test]
fn test_arity_mismatch_is_an_error() {
    expect_error("fn() { 1 }(1)", "wrong number of arguments: expected 0, got 1");
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_arithmetic_and_folding() {
    assert_eq!(run_ok("x = 4; x * 2 + 1"), Value::Int(9));
    assert_eq!(run_ok("x = 7; x / 2"), Value::Float(3.5));
    assert_eq!(run_ok("x = 7; x % 3"), Value::Int(1));
    assert_eq!(run_ok("2 * (3 + 4)"), Value::Int(14));
    assert_eq!(run_ok("x = 1; -x"), Value::Int(-1));
}

#[test]
fn test_comparisons() {
    assert_eq!(run_ok("a = 1; b = 2; a < b"), Value::Bool(true));
    assert_eq!(run_ok("a = 2; b = 2; a <= b"), Value::Bool(true));
    assert_eq!(run_ok("a = 3; b = 2; a < b"), Value::Bool(false));
    assert_eq!(run_ok("a = \"x\"; a == \"x\""), Value::Bool(true));
}

#[test]
fn test_bitwise() {
    assert_eq!(run_ok("x = 6; x & 3"), Value::Int(2));
    assert_eq!(run_ok("x = 6; x | 1"), Value::Int(7));
    assert_eq!(run_ok("x = 1; x << 4"), Value::Int(16));
    assert_eq!(run_ok("x = 0; ~x"), Value::Int(-1));
}

#[test]
fn test_in_operator() {
    assert_eq!(run_ok("xs = [1, 2]; 2 in xs"), Value::Bool(true));
    assert_eq!(run_ok("m = {\"k\": 1}; \"k\" in m"), Value::Bool(true));
}

#[test]
fn test_if_is_an_expression() {
    assert_eq!(run_ok("x = 5; if x > 3 { \"big\" } else { \"small\" }"), Value::string("big"));
    assert_eq!(run_ok("x = 1; if x > 3 { \"big\" }"), Value::Null);
    assert_eq!(run_ok("if true { }"), Value::Null);
    assert_eq!(
        run_ok("x = 2; if x == 1 { 1 } else if x == 2 { 2 } else { 3 }"),
        Value::Int(2)
    );
}

// =============================================================================
// Variables and assignment
// =============================================================================

#[test]
fn test_compound_assignment() {
    assert_eq!(run_ok("x = 1; x += 4; x"), Value::Int(5));
    assert_eq!(run_ok("x = 10; x -= 4; x"), Value::Int(6));
    assert_eq!(run_ok("x = 1; ++x; ++x; --x; x"), Value::Int(2));
}

#[test]
fn test_compound_assignment_through_handles() {
    assert_eq!(run_ok("a = [1, 2]; a[0] += 10; a"), run_ok("[11, 2]"));
    assert_eq!(run_ok("m = {\"n\": 1}; ++m[\"n\"]; m[\"n\"]"), Value::Int(2));
    assert_eq!(run_ok("o = new(); o.n = 1; o.n *= 5; o.n"), Value::Int(5));
}

#[test]
fn test_compound_assignment_evaluates_the_target_twice() {
    let src = "
        n = 0
        k = fn() { n += 1; 0 }
        a = [1]
        a[k()] += 1
        [n, a[0]]
    ";
    assert_eq!(run_ok(src).to_string(), "[2, 2]");
    assert_eq!(run_ok("n = 0; k = fn() { n += 1; 0 }; a = [5]; ++a[k()]; n"), Value::Int(2));
}

#[test]
fn test_map_assignment_inserts() {
    assert_eq!(run_ok("m = {}; m[\"a\"] = 1; m[\"a\"]"), Value::Int(1));
    assert_eq!(run_ok("m = {}; m[\"missing\"]"), Value::Null);
}

#[test]
fn test_functions_assign_globals() {
    assert_eq!(run_ok("x = 1; f = fn() { x = 2; x }; f() + x"), Value::Int(4));
}

#[test]
fn test_parameters_shadow_globals() {
    assert_eq!(run_ok("x = 1; f = fn(x) { x = x * 10; x }; f(5) + x"), Value::Int(51));
}

#[test]
fn test_assigning_a_builtin_name_shadows_it() {
    assert_eq!(run_ok("len = 3; len"), Value::Int(3));
}

#[test]
fn test_assign_to_literal_is_a_compile_error() {
    expect_error("1 = 2", "cannot assign to literal");
}

#[test]
fn test_undefined_variable() {
    expect_error("y + 1", "undefined variable y");
}

// =============================================================================
// Functions and closures
// =============================================================================

#[test]
fn test_recursion_through_own_name() {
    assert_eq!(
        run_ok("fib = fn(n) { if n < 2 { return n }; fib(n - 1) + fib(n - 2) }; fib(15)"),
        Value::Int(610)
    );
}

#[test]
fn test_free_variables_through_nested_functions() {
    let src = "
        outer = fn(a) {
            fn(b) {
                fn(c) { a + b + c }
            }
        }
        outer(1)(2)(3)
    ";
    assert_eq!(run_ok(src), Value::Int(6));
}

#[test]
fn test_closures_capture_by_value() {
    let src = "
        make = fn() {
            n = 1
            get = fn() { n }
            n = 2
            get
        }
        make()()
    ";
    assert_eq!(run_ok(src), Value::Int(1));
}

#[test]
fn test_globals_are_read_live() {
    assert_eq!(run_ok("n = 1; get = fn() { n }; n = 2; get()"), Value::Int(2));
}

#[test]
fn test_function_without_return_yields_last_value() {
    assert_eq!(run_ok("f = fn() { 1; 2 }; f()"), Value::Int(2));
    assert_eq!(run_ok("f = fn() { }; f()"), Value::Null);
    assert_eq!(run_ok("f = fn() { return }; f()"), Value::Null);
}

#[test]
fn test_builtins() {
    assert_eq!(run_ok("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(run_ok("type(1.5)"), Value::string("float"));
    assert_eq!(run_ok("xs = append([1], 2); len(xs)"), Value::Int(2));
    assert_eq!(run_ok("failed(error(\"x\"))"), Value::Bool(true));
}

#[test]
fn test_builtin_errors_are_values() {
    assert!(run_ok("len(1)").is_error());
}

#[test]
fn test_calling_a_non_function() {
    expect_error("x = 1; x()", "calling non-function");
}

#[test]
fn test_deep_recursion_overflows_cleanly() {
    expect_error("f = fn() { f() }; f()", "overflow");
}

// =============================================================================
// Loops
// =============================================================================

#[test]
fn test_break_and_continue() {
    let src = "
        total = 0
        for i = 0; i < 10; ++i {
            if i == 7 { break }
            if i % 2 == 0 { continue }
            total += i
        }
        total
    ";
    assert_eq!(run_ok(src), Value::Int(1 + 3 + 5));
}

#[test]
fn test_break_leaves_only_the_innermost_loop() {
    let src = "
        count = 0
        for i = 0; i < 3; ++i {
            for j = 0; j < 100; ++j {
                if j == 2 { break }
                count += 1
            }
            count += 100
        }
        count
    ";
    assert_eq!(run_ok(src), Value::Int(306));
}

#[test]
fn test_continue_steps_the_innermost_loop() {
    let src = "
        hits = 0
        for i = 0; i < 3; ++i {
            for j = 0; j < 4; ++j {
                if j < 2 { continue }
                hits += 1
            }
        }
        hits
    ";
    assert_eq!(run_ok(src), Value::Int(6));
}

#[test]
fn test_condition_only_loop() {
    assert_eq!(run_ok("n = 0; for n < 4 { ++n }; n"), Value::Int(4));
    assert_eq!(run_ok("n = 0; for { ++n; if n == 3 { break } }; n"), Value::Int(3));
}

// =============================================================================
// Collections, strings, objects
// =============================================================================

#[test]
fn test_string_index() {
    assert_eq!(run_ok("s = \"abc\"; s[1]"), Value::string("b"));
    expect_error("s = \"abc\"; s[5]", "index out of range");
}

#[test]
fn test_list_index_out_of_range_is_an_error_value() {
    assert!(run_ok("xs = [1]; xs[3]").is_error());
}

#[test]
fn test_invalid_map_key() {
    expect_error("m = {[1]: 2}", "invalid map key type");
}

#[test]
fn test_objects() {
    assert_eq!(run_ok("o = new(); o.name = \"tau\"; o.name"), Value::string("tau"));
    assert_eq!(run_ok("o = new(); o.missing"), Value::Null);
    expect_error("x = 1; x.y", "has no attribute y");
}

#[test]
fn test_self_containing_containers_print() {
    assert_eq!(run_ok("a = [0]; a[0] = a; string(a)"), Value::string("[[...]]"));
    assert_eq!(run_ok("a = [0]; a[0] = a; println(a)"), Value::Null);
    assert_eq!(
        run_ok("m = {}; m[\"self\"] = m; string(m)"),
        Value::string("{\"self\": {...}}")
    );
    assert_eq!(run_ok("o = new(); o.me = o; string(o)"), Value::string("{me: {...}}"));
    assert_eq!(run_ok("a = [1]; b = [a, a]; string(b)"), Value::string("[[1], [1]]"));
}

#[test]
fn test_deeply_nested_list_prints() {
    let printed = run_ok("a = []; for i = 0; i < 2000; ++i { a = [a] }; string(a)");
    assert!(printed.to_string().starts_with("[[[["));
    assert!(printed.to_string().contains("[...]"));
}

#[test]
fn test_interpolation() {
    assert_eq!(run_ok("x = 2; \"x is {x}, next {x + 1}\""), Value::string("x is 2, next 3"));
    assert_eq!(run_ok("\"{{literal}}\""), Value::string("{literal}"));
}

#[test]
fn test_interpolation_reuses_compiled_snippets() {
    let src = "
        out = []
        for i = 0; i < 3; ++i { out = append(out, \"n{i}\") }
        out
    ";
    assert_eq!(run_ok(src).to_string(), "[\"n0\", \"n1\", \"n2\"]");
}

#[test]
fn test_bad_interpolation_is_a_compile_error() {
    expect_error("\"open {x\"", "interpolation");
}

// =============================================================================
// Errors and state
// =============================================================================

#[test]
fn test_runtime_errors_point_at_their_line() {
    let err = compile_and_run("a = 1\nb = a % 0\n").unwrap_err();
    assert!(err.contains("line 2"), "{}", err);
    assert!(err.contains("b = a % 0"), "{}", err);
    assert!(err.ends_with("division by zero"), "{}", err);
}

#[test]
fn test_units_share_state() {
    let mut state = State::with_lib_paths(Vec::new());
    run_in(&mut state, None, "x = 40").unwrap();
    run_in(&mut state, None, "f = fn() { x + 1 }").unwrap();
    assert_eq!(run_in(&mut state, None, "f() + 1").unwrap(), Value::Int(42));
}

#[test]
fn test_state_survives_a_runtime_error() {
    let mut state = State::with_lib_paths(Vec::new());
    run_in(&mut state, None, "x = 1").unwrap();
    assert!(run_in(&mut state, None, "y = x % 0").is_err());
    assert_eq!(run_in(&mut state, None, "x + 1").unwrap(), Value::Int(2));
}
