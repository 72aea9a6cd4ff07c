// tau-core - Property-based tests for values
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the object model.
//!
//! Tests the following properties:
//! - Snapshots restore to structurally equal values
//! - Map key ordering is a total order consistent with equality
//! - Map display order follows key order

use std::rc::Rc;

use proptest::prelude::*;
use tau_core::{MapKey, Snapshot, Value};

// =============================================================================
// Strategies
// =============================================================================

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("must be finite", |f| f.is_finite())
            .prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(|s| Value::string(&s)),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::list),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|pairs| {
                Value::map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (MapKey::Str(Rc::from(k.as_str())), v))
                        .collect(),
                )
            }),
        ]
    })
}

fn arb_key() -> impl Strategy<Value = MapKey> {
    prop_oneof![
        any::<bool>().prop_map(MapKey::Bool),
        any::<i64>().prop_map(MapKey::Int),
        any::<f64>()
            .prop_filter("must be finite", |f| f.is_finite())
            .prop_map(MapKey::Float),
        "[a-z]{0,6}".prop_map(|s| MapKey::Str(Rc::from(s.as_str()))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// restore(capture(v)) == v
    #[test]
    fn snapshot_restores_equal_value(v in arb_value()) {
        let restored = Snapshot::capture(&v).unwrap().restore();
        prop_assert_eq!(restored.to_string(), v.to_string());
        prop_assert_eq!(restored, v);
    }

    /// cmp(a, b) is the reverse of cmp(b, a), and Equal iff ==
    #[test]
    fn map_key_order_is_antisymmetric(a in arb_key(), b in arb_key()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a.cmp(&b) == std::cmp::Ordering::Equal, a == b);
    }

    /// Keys come back from a map in sorted order.
    #[test]
    fn map_keys_are_sorted(keys in prop::collection::vec(arb_key(), 0..8)) {
        let v = Value::map(keys.iter().cloned().map(|k| (k, Value::Null)).collect());
        if let Value::Map(entries) = &v {
            let got: Vec<MapKey> = entries.borrow().keys().cloned().collect();
            let mut expected = keys.clone();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(got, expected);
        }
    }
}
