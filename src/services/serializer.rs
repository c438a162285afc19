//! 64-bit integer serialization
//!
//! Identifier columns hold 64-bit integers that JavaScript clients cannot
//! represent exactly. Two adapters turn a `SqlValue` tree into JSON:
//!
//! - [`serialize_bigint_safe`] writes every `BigInt` as its decimal string.
//!   Lossless and infallible; the list service uses it for every row.
//! - [`serialize_bigint_as_number`] writes `BigInt` as a JSON number and fails
//!   with [`SerializeError::OutOfSafeRange`] when the value is outside
//!   ±(2^53 − 1). For endpoints that must emit plain numeric ids.
//!
//! Both walk arrays element-wise and objects key-wise, preserving key order.
//! Timestamps are written as RFC 3339 strings.

use std::convert::Infallible;

use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::db::value::SqlValue;

/// Largest integer an IEEE-754 double represents exactly (2^53 − 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Smallest integer an IEEE-754 double represents exactly (−(2^53 − 1))
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("Integer {value} is outside the safe integer range and cannot be emitted as a number")]
    OutOfSafeRange { value: i64 },
}

pub fn is_safe_integer(value: i64) -> bool {
    (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value)
}

/// String-preserving conversion: `BigInt` becomes its decimal string.
pub fn serialize_bigint_safe(value: &SqlValue) -> Value {
    match convert(value, &|v| Ok::<_, Infallible>(Value::String(v.to_string()))) {
        Ok(json) => json,
        Err(never) => match never {},
    }
}

/// Number-coercing conversion: `BigInt` becomes a JSON number, or an error
/// when it cannot be represented exactly.
pub fn serialize_bigint_as_number(value: &SqlValue) -> Result<Value, SerializeError> {
    convert(value, &|v| {
        if is_safe_integer(v) {
            Ok(Value::Number(Number::from(v)))
        } else {
            Err(SerializeError::OutOfSafeRange { value: v })
        }
    })
}

/// Recursive walk shared by both adapters; only the `BigInt` leaf differs.
fn convert<E>(value: &SqlValue, bigint: &dyn Fn(i64) -> Result<Value, E>) -> Result<Value, E> {
    Ok(match value {
        SqlValue::BigInt(v) => bigint(*v)?,
        SqlValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(item, bigint))
                .collect::<Result<_, _>>()?,
        ),
        SqlValue::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, field) in fields {
                map.insert(key.clone(), convert(field, bigint)?);
            }
            Value::Object(map)
        }
        SqlValue::Null => Value::Null,
        SqlValue::Bool(v) => Value::Bool(*v),
        SqlValue::Integer(v) => Value::Number(Number::from(*v)),
        SqlValue::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        SqlValue::Text(v) => Value::String(v.clone()),
        SqlValue::Timestamp(v) => Value::String(v.to_rfc3339_opts(SecondsFormat::Millis, true)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample() -> SqlValue {
        SqlValue::Object(vec![
            ("id".into(), SqlValue::BigInt(1_234_567_890_123_456_789)),
            ("name".into(), SqlValue::from("Ranked Duos")),
            ("maxPlayers".into(), SqlValue::Integer(4)),
            ("deletedAt".into(), SqlValue::Null),
            (
                "members".into(),
                SqlValue::Array(vec![SqlValue::BigInt(1), SqlValue::BigInt(-2)]),
            ),
        ])
    }

    #[test]
    fn test_safe_adapter_stringifies_bigints() {
        assert_eq!(
            serialize_bigint_safe(&sample()),
            json!({
                "id": "1234567890123456789",
                "name": "Ranked Duos",
                "maxPlayers": 4,
                "deletedAt": null,
                "members": ["1", "-2"],
            })
        );
    }

    #[test]
    fn test_safe_adapter_preserves_key_order() {
        let value = serialize_bigint_safe(&SqlValue::Object(vec![
            ("zeta".into(), SqlValue::Integer(1)),
            ("alpha".into(), SqlValue::Integer(2)),
            ("mid".into(), SqlValue::Integer(3)),
        ]));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_null_is_not_traversed() {
        assert_eq!(serialize_bigint_safe(&SqlValue::Null), Value::Null);
        assert_eq!(serialize_bigint_as_number(&SqlValue::Null), Ok(Value::Null));
    }

    #[test]
    fn test_scalars_pass_through() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            serialize_bigint_safe(&SqlValue::Timestamp(ts)),
            json!("2024-05-01T12:30:00.000Z")
        );
        assert_eq!(serialize_bigint_safe(&SqlValue::Float(1.5)), json!(1.5));
        assert_eq!(serialize_bigint_safe(&SqlValue::Float(f64::NAN)), Value::Null);
        assert_eq!(serialize_bigint_safe(&SqlValue::Bool(false)), json!(false));
    }

    #[test]
    fn test_number_adapter_within_range() {
        let value = SqlValue::Object(vec![
            ("id".into(), SqlValue::BigInt(MAX_SAFE_INTEGER)),
            ("low".into(), SqlValue::BigInt(MIN_SAFE_INTEGER)),
        ]);
        assert_eq!(
            serialize_bigint_as_number(&value).unwrap(),
            json!({ "id": 9_007_199_254_740_991i64, "low": -9_007_199_254_740_991i64 })
        );
    }

    #[test]
    fn test_number_adapter_rejects_unsafe_values() {
        let nested = SqlValue::Array(vec![
            SqlValue::BigInt(1),
            SqlValue::Object(vec![("id".into(), SqlValue::BigInt(MAX_SAFE_INTEGER + 1))]),
        ]);
        assert_eq!(
            serialize_bigint_as_number(&nested),
            Err(SerializeError::OutOfSafeRange {
                value: MAX_SAFE_INTEGER + 1
            })
        );
        assert!(serialize_bigint_as_number(&SqlValue::BigInt(MIN_SAFE_INTEGER - 1)).is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn leaf() -> impl Strategy<Value = SqlValue> {
            prop_oneof![
                Just(SqlValue::Null),
                any::<bool>().prop_map(SqlValue::Bool),
                any::<i32>().prop_map(|v| SqlValue::Integer(v as i64)),
                any::<i64>().prop_map(SqlValue::BigInt),
                "[a-z0-9 ]{0,12}".prop_map(SqlValue::Text),
            ]
        }

        fn tree() -> impl Strategy<Value = SqlValue> {
            leaf().prop_recursive(4, 48, 6, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..6).prop_map(SqlValue::Array),
                    prop::collection::vec(("[a-z]{1,8}", inner), 0..6).prop_map(|fields| {
                        // Object keys are unique in decoded rows
                        let mut seen = std::collections::HashSet::new();
                        SqlValue::Object(
                            fields
                                .into_iter()
                                .filter(|(k, _)| seen.insert(k.clone()))
                                .collect(),
                        )
                    }),
                ]
            })
        }

        /// Same shape, non-bigint leaves unchanged, bigints as exact decimal strings
        fn assert_safe_shape(original: &SqlValue, json: &Value) -> Result<(), TestCaseError> {
            match (original, json) {
                (SqlValue::BigInt(v), Value::String(s)) => {
                    prop_assert_eq!(s.parse::<i64>().unwrap(), *v);
                }
                (SqlValue::Array(items), Value::Array(out)) => {
                    prop_assert_eq!(items.len(), out.len());
                    for (a, b) in items.iter().zip(out) {
                        assert_safe_shape(a, b)?;
                    }
                }
                (SqlValue::Object(fields), Value::Object(out)) => {
                    prop_assert_eq!(fields.len(), out.len());
                    for ((key, a), (out_key, b)) in fields.iter().zip(out.iter()) {
                        prop_assert_eq!(key, out_key);
                        assert_safe_shape(a, b)?;
                    }
                }
                (SqlValue::Null, Value::Null) => {}
                (SqlValue::Bool(a), Value::Bool(b)) => prop_assert_eq!(a, b),
                (SqlValue::Integer(a), Value::Number(n)) => prop_assert_eq!(Some(*a), n.as_i64()),
                (SqlValue::Text(a), Value::String(b)) => prop_assert_eq!(a, b),
                (a, b) => prop_assert!(false, "shape mismatch: {:?} vs {:?}", a, b),
            }
            Ok(())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn safe_adapter_is_lossless(value in tree()) {
                let json = serialize_bigint_safe(&value);
                assert_safe_shape(&value, &json)?;
            }

            #[test]
            fn number_adapter_exact_within_range(v in MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER) {
                let json = serialize_bigint_as_number(&SqlValue::BigInt(v)).unwrap();
                prop_assert_eq!(json.as_i64(), Some(v));
            }

            #[test]
            fn number_adapter_fails_outside_range(
                v in prop_oneof![(MAX_SAFE_INTEGER + 1)..=i64::MAX, i64::MIN..MIN_SAFE_INTEGER]
            ) {
                prop_assert_eq!(
                    serialize_bigint_as_number(&SqlValue::BigInt(v)),
                    Err(SerializeError::OutOfSafeRange { value: v })
                );
            }
        }
    }
}
