//! Field validation helpers shared by the resource inputs

use serde::{de, Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trim a required text field and check its length in characters
pub fn required_text(
    field: &'static str,
    value: &str,
    min_len: usize,
    max_len: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if len < min_len || len > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {} characters", min_len, max_len),
        ));
    }
    Ok(value.to_string())
}

/// Trim an optional text field. Blank text becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max_len => Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

pub fn int_in_range(
    field: &'static str,
    value: i64,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, ValidationError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::new(
            field,
            format!("must be between {} and {}", range.start(), range.end()),
        ))
    }
}

/// Parse a path or query identifier
pub fn parse_id(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ValidationError::new(field, format!("'{}' is not a valid id", raw)))
}

// Ids leave the API as strings, so clients may send them back either way.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_id<E: de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid id: {}", s))),
        }
    }
}

/// Deserialize an id given as a JSON number or a decimal string
pub fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    RawId::deserialize(deserializer)?.into_id()
}

pub fn deserialize_optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<RawId>::deserialize(deserializer)?
        .map(RawId::into_id)
        .transpose()
}

/// Keep an explicit `null` apart from an absent field.
///
/// Used with `#[serde(default)]`: a missing field stays `None` and `null`
/// becomes `Some(None)`.
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn deserialize_nullable_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<i64>>, D::Error> {
    deserialize_optional_id(deserializer).map(Some)
}
