//! Row values
//!
//! `SqlValue` is the in-process value tree rows are decoded into. It keeps
//! 64-bit identifiers (`BigInt`) apart from ordinary integers so the
//! serialization adapter knows which numbers are unsafe to emit as JSON.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::Row;

use super::entity::{ColumnKind, EntityDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    /// Integer declared JSON-safe by its column
    Integer(i64),
    /// 64-bit identifier, not JSON-safe
    BigInt(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<SqlValue>),
    /// Ordered key/value pairs
    Object(Vec<(String, SqlValue)>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Field lookup on an `Object`
    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        match self {
            SqlValue::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Integer payload of `Integer` or `BigInt`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) | SqlValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// A decoded table row
pub type Record = SqlValue;

// ============================================================================
// Decoding
// ============================================================================

// Both drivers decode the same column kinds the same way.
macro_rules! decode_row {
    ($row:expr, $descriptor:expr) => {{
        let mut fields = Vec::with_capacity($descriptor.columns.len());
        for column in $descriptor.columns {
            let name = column.name;
            let value = match column.kind {
                ColumnKind::BigInt => $row.try_get::<Option<i64>, _>(name)?.map(SqlValue::BigInt),
                ColumnKind::Integer => $row.try_get::<Option<i64>, _>(name)?.map(SqlValue::Integer),
                ColumnKind::Float => $row.try_get::<Option<f64>, _>(name)?.map(SqlValue::Float),
                ColumnKind::Text => $row.try_get::<Option<String>, _>(name)?.map(SqlValue::Text),
                ColumnKind::Bool => $row.try_get::<Option<bool>, _>(name)?.map(SqlValue::Bool),
                ColumnKind::Timestamp => $row
                    .try_get::<Option<DateTime<Utc>>, _>(name)?
                    .map(SqlValue::Timestamp),
            };
            fields.push((column.field.to_string(), value.unwrap_or(SqlValue::Null)));
        }
        Ok(SqlValue::Object(fields))
    }};
}

pub(crate) fn decode_sqlite_row(row: &SqliteRow, descriptor: &EntityDescriptor) -> Result<Record> {
    decode_row!(row, descriptor)
}

pub(crate) fn decode_mysql_row(row: &MySqlRow, descriptor: &EntityDescriptor) -> Result<Record> {
    decode_row!(row, descriptor)
}

// ============================================================================
// Binding
// ============================================================================

macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Integer(v) | SqlValue::BigInt(v) => query.bind(*v),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
                SqlValue::Timestamp(v) => query.bind(*v),
                SqlValue::Array(_) | SqlValue::Object(_) => {
                    anyhow::bail!("Nested values cannot be bound as query parameters")
                }
            };
        }
        Ok(query)
    }};
}

pub(crate) fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    bind_params!(query, params)
}

pub(crate) fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlValue],
) -> Result<Query<'q, MySql, MySqlArguments>> {
    bind_params!(query, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entity::{ColumnDef, Deletion, IdStrategy};
    use crate::db::create_test_pool;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("score", "score", ColumnKind::Integer),
        ColumnDef::new("ratio", "ratio", ColumnKind::Float),
        ColumnDef::new("label", "label", ColumnKind::Text),
        ColumnDef::new("active", "isActive", ColumnKind::Bool),
        ColumnDef::new("seen_at", "seenAt", ColumnKind::Timestamp),
    ];

    const SAMPLE: EntityDescriptor = EntityDescriptor {
        table: "samples",
        primary_key: "id",
        columns: COLUMNS,
        deletion: Deletion::HardDeleteOnly,
        id_strategy: IdStrategy::Snowflake,
        version_column: None,
    };

    #[tokio::test]
    async fn test_sqlite_bind_and_decode_round_trip() {
        let pool = create_test_pool().await.unwrap();
        pool.execute(
            "CREATE TABLE samples (id INTEGER PRIMARY KEY, score INTEGER, ratio REAL, \
             label TEXT, active BOOLEAN, seen_at TIMESTAMP)",
        )
        .await
        .unwrap();
        let sqlite = pool.as_sqlite().unwrap();

        let seen_at = chrono::TimeZone::timestamp_opt(&Utc, 1_700_000_000, 0).unwrap();
        let params = vec![
            SqlValue::BigInt(9_007_199_254_740_993),
            SqlValue::Integer(42),
            SqlValue::Null,
            SqlValue::from("bronze"),
            SqlValue::Bool(true),
            SqlValue::Timestamp(seen_at),
        ];
        let query = sqlx::query("INSERT INTO samples VALUES (?, ?, ?, ?, ?, ?)");
        bind_sqlite(query, &params)
            .unwrap()
            .execute(sqlite)
            .await
            .unwrap();

        let row = sqlx::query("SELECT id, score, ratio, label, active, seen_at FROM samples")
            .fetch_one(sqlite)
            .await
            .unwrap();
        let record = decode_sqlite_row(&row, &SAMPLE).unwrap();

        assert_eq!(record.get("id"), Some(&SqlValue::BigInt(9_007_199_254_740_993)));
        assert_eq!(record.get("score"), Some(&SqlValue::Integer(42)));
        assert_eq!(record.get("ratio"), Some(&SqlValue::Null));
        assert_eq!(record.get("label"), Some(&SqlValue::from("bronze")));
        assert_eq!(record.get("isActive"), Some(&SqlValue::Bool(true)));
        assert_eq!(record.get("seenAt"), Some(&SqlValue::Timestamp(seen_at)));
    }

    #[test]
    fn test_nested_values_are_not_bindable() {
        let query = sqlx::query("SELECT ?");
        let result = bind_sqlite(query, &[SqlValue::Array(vec![])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }
}
