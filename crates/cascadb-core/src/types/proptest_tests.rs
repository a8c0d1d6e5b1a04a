//! Property-based tests for value ordering.

use std::cmp::Ordering;

use proptest::prelude::*;

use super::Value;

/// Strategy for generating arbitrary scalar `Value` instances.
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1_000i64..1_000).prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        (-1_000i64..1_000).prop_map(|i| Value::Float(i as f64 / 4.0)),
        "[a-c]{0,3}".prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn ordering_is_antisymmetric(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a.sql_cmp(&b), b.sql_cmp(&a).reverse());
    }

    #[test]
    fn ordering_is_reflexive(a in arb_value()) {
        prop_assert_eq!(a.sql_cmp(&a), Ordering::Equal);
        prop_assert!(a.not_distinct(&a));
    }

    #[test]
    fn ordering_is_transitive(a in arb_value(), b in arb_value(), c in arb_value()) {
        if a.sql_cmp(&b) != Ordering::Greater && b.sql_cmp(&c) != Ordering::Greater {
            prop_assert_ne!(a.sql_cmp(&c), Ordering::Greater);
        }
    }

    #[test]
    fn sorted_values_are_non_decreasing(mut values in prop::collection::vec(arb_value(), 0..32)) {
        values.sort_by(Value::sql_cmp);
        for pair in values.windows(2) {
            prop_assert_ne!(pair[0].sql_cmp(&pair[1]), Ordering::Greater);
        }
    }
}
