// tau-parser - Property-based tests for the parser
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for parsing and source locations.
//!
//! Tests the following properties:
//! - Multiplicative operators bind tighter than additive ones
//! - Binary operators of equal precedence associate to the left
//! - Source locations always point inside the reported line

use proptest::prelude::*;
use tau_parser::{locate, parse_str};

fn arb_small_int() -> impl Strategy<Value = i64> {
    0i64..1_000_000i64
}

fn arb_additive() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("+"), Just("-")]
}

fn arb_multiplicative() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("*"), Just("/"), Just("%")]
}

fn show(src: &str) -> String {
    let program = parse_str(src).unwrap();
    program[0].to_string()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// a + b * c parses as (a + (b * c))
    #[test]
    fn multiplicative_binds_tighter(
        a in arb_small_int(),
        b in arb_small_int(),
        c in arb_small_int(),
        add in arb_additive(),
        mul in arb_multiplicative(),
    ) {
        let src = format!("{} {} {} {} {}", a, add, b, mul, c);
        prop_assert_eq!(show(&src), format!("({} {} ({} {} {}))", a, add, b, mul, c));
    }

    /// a - b - c parses as ((a - b) - c)
    #[test]
    fn additive_is_left_associative(
        a in arb_small_int(),
        b in arb_small_int(),
        c in arb_small_int(),
        op1 in arb_additive(),
        op2 in arb_additive(),
    ) {
        let src = format!("{} {} {} {} {}", a, op1, b, op2, c);
        prop_assert_eq!(show(&src), format!("(({} {} {}) {} {})", a, op1, b, op2, c));
    }

    /// The caret column never runs past the end of the trimmed line.
    #[test]
    fn location_column_within_line(src in "[a-z \t\n]{0,40}", pos in 0usize..48) {
        let loc = locate(&src, pos);
        prop_assert!(loc.column <= loc.line.len());
        prop_assert!(loc.lineno >= 1);
        prop_assert!(loc.lineno <= src.matches('\n').count() + 1);
    }
}
