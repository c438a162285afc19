//! Record repository
//!
//! Database operations for any table described by an [`EntityDescriptor`].
//!
//! This module provides:
//! - `RecordRepository` trait defining descriptor-driven data access
//! - `SqlxRecordRepository` implementing the trait for SQLite and MySQL
//!
//! Table and column names only ever come from static descriptors; values
//! are always bound as parameters.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::entity::{EntityDescriptor, SortOrder};
use crate::db::filter::{render_where, Filter, WhereClause};
use crate::db::pool::{require_mysql, require_sqlite};
use crate::db::value::{
    bind_mysql, bind_sqlite, decode_mysql_row, decode_sqlite_row, Record, SqlValue,
};
use crate::db::DynDatabasePool;

/// Column and direction for an ORDER BY clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub order: SortOrder,
}

/// Record repository trait
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// One page of rows matching `clause`
    async fn find_page(
        &self,
        descriptor: &'static EntityDescriptor,
        clause: &WhereClause,
        order_by: Option<OrderBy>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Record>>;

    /// Number of rows matching `clause`
    async fn count(&self, descriptor: &'static EntityDescriptor, clause: &WhereClause)
        -> Result<i64>;

    async fn find_by_id(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        include_soft_deleted: bool,
    ) -> Result<Option<Record>>;

    async fn exists(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        include_soft_deleted: bool,
    ) -> Result<bool>;

    /// Insert a row and return its primary key
    async fn insert(
        &self,
        descriptor: &'static EntityDescriptor,
        values: &[(&'static str, SqlValue)],
    ) -> Result<i64>;

    /// Update a live row and return the number of rows changed.
    ///
    /// With `expected_version`, the write only applies when the version
    /// column still holds that value, and increments it.
    async fn update(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        values: &[(&'static str, SqlValue)],
        expected_version: Option<i64>,
    ) -> Result<u64>;

    /// Stamp the soft-delete column. Returns false if the row was missing or
    /// already deleted.
    async fn soft_delete(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn hard_delete(&self, descriptor: &'static EntityDescriptor, id: i64) -> Result<bool>;
}

/// SQLx-based record repository implementation
pub struct SqlxRecordRepository {
    pool: DynDatabasePool,
}

impl SqlxRecordRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecordRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_records(
        &self,
        descriptor: &EntityDescriptor,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Record>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_sqlite(sqlx::query(sql), params)?
                    .fetch_all(require_sqlite(self.pool.as_ref())?)
                    .await
                    .with_context(|| format!("Failed to query {}", descriptor.table))?;
                rows.iter()
                    .map(|row| decode_sqlite_row(row, descriptor))
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_mysql(sqlx::query(sql), params)?
                    .fetch_all(require_mysql(self.pool.as_ref())?)
                    .await
                    .with_context(|| format!("Failed to query {}", descriptor.table))?;
                rows.iter()
                    .map(|row| decode_mysql_row(row, descriptor))
                    .collect()
            }
        }
    }

    async fn fetch_count(&self, sql: &str, params: &[SqlValue]) -> Result<i64> {
        let total = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_sqlite(sqlx::query(sql), params)?
                .fetch_one(require_sqlite(self.pool.as_ref())?)
                .await?
                .try_get::<i64, _>("total")?,
            DatabaseDriver::Mysql => bind_mysql(sqlx::query(sql), params)?
                .fetch_one(require_mysql(self.pool.as_ref())?)
                .await?
                .try_get::<i64, _>("total")?,
        };
        Ok(total)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let result = bind_sqlite(sqlx::query(sql), params)?
                    .execute(require_sqlite(self.pool.as_ref())?)
                    .await?;
                Ok(Executed {
                    rows_affected: result.rows_affected(),
                    last_insert_id: result.last_insert_rowid(),
                })
            }
            DatabaseDriver::Mysql => {
                let result = bind_mysql(sqlx::query(sql), params)?
                    .execute(require_mysql(self.pool.as_ref())?)
                    .await?;
                Ok(Executed {
                    rows_affected: result.rows_affected(),
                    last_insert_id: result.last_insert_id() as i64,
                })
            }
        }
    }
}

struct Executed {
    rows_affected: u64,
    last_insert_id: i64,
}

#[async_trait]
impl RecordRepository for SqlxRecordRepository {
    async fn find_page(
        &self,
        descriptor: &'static EntityDescriptor,
        clause: &WhereClause,
        order_by: Option<OrderBy>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Record>> {
        let sql = select_page_sql(descriptor, clause, order_by)?;
        let mut params = clause.params.clone();
        params.push(SqlValue::Integer(limit));
        params.push(SqlValue::Integer(offset));

        self.fetch_records(descriptor, &sql, &params).await
    }

    async fn count(
        &self,
        descriptor: &'static EntityDescriptor,
        clause: &WhereClause,
    ) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}{}", descriptor.table, clause.sql);
        self.fetch_count(&sql, &clause.params)
            .await
            .with_context(|| format!("Failed to count {}", descriptor.table))
    }

    async fn find_by_id(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        include_soft_deleted: bool,
    ) -> Result<Option<Record>> {
        let clause = by_id_clause(descriptor, id, include_soft_deleted);
        let sql = format!(
            "SELECT {} FROM {}{}",
            descriptor.select_list(),
            descriptor.table,
            clause.sql
        );

        let mut records = self.fetch_records(descriptor, &sql, &clause.params).await?;
        Ok(records.pop())
    }

    async fn exists(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        include_soft_deleted: bool,
    ) -> Result<bool> {
        let clause = by_id_clause(descriptor, id, include_soft_deleted);
        Ok(self.count(descriptor, &clause).await? > 0)
    }

    async fn insert(
        &self,
        descriptor: &'static EntityDescriptor,
        values: &[(&'static str, SqlValue)],
    ) -> Result<i64> {
        let sql = insert_sql(descriptor, values)?;
        let params: Vec<SqlValue> = values.iter().map(|(_, v)| v.clone()).collect();

        let executed = self
            .execute(&sql, &params)
            .await
            .with_context(|| format!("Failed to insert into {}", descriptor.table))?;

        // Application-assigned keys come back as written
        let assigned = values
            .iter()
            .find(|(column, _)| *column == descriptor.primary_key)
            .and_then(|(_, value)| value.as_i64());
        Ok(assigned.unwrap_or(executed.last_insert_id))
    }

    async fn update(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        values: &[(&'static str, SqlValue)],
        expected_version: Option<i64>,
    ) -> Result<u64> {
        let (sql, params) = update_statement(descriptor, id, values, expected_version)?;
        let executed = self
            .execute(&sql, &params)
            .await
            .with_context(|| format!("Failed to update {} {}", descriptor.table, id))?;
        Ok(executed.rows_affected)
    }

    async fn soft_delete(
        &self,
        descriptor: &'static EntityDescriptor,
        id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(column) = descriptor.deleted_at_column() else {
            bail!("Table '{}' does not support soft delete", descriptor.table);
        };

        let clause = by_id_clause(descriptor, id, false);
        let sql = format!("UPDATE {} SET {} = ?{}", descriptor.table, column, clause.sql);
        let mut params = vec![SqlValue::Timestamp(deleted_at)];
        params.extend(clause.params);

        let executed = self
            .execute(&sql, &params)
            .await
            .with_context(|| format!("Failed to soft delete {} {}", descriptor.table, id))?;
        Ok(executed.rows_affected > 0)
    }

    async fn hard_delete(&self, descriptor: &'static EntityDescriptor, id: i64) -> Result<bool> {
        let clause = by_id_clause(descriptor, id, true);
        let sql = format!("DELETE FROM {}{}", descriptor.table, clause.sql);

        let executed = self
            .execute(&sql, &clause.params)
            .await
            .with_context(|| format!("Failed to delete {} {}", descriptor.table, id))?;
        Ok(executed.rows_affected > 0)
    }
}

// ============================================================================
// SQL construction
// ============================================================================

fn ensure_declared(descriptor: &EntityDescriptor, column: &str) -> Result<()> {
    if !descriptor.has_column(column) {
        bail!(
            "Column '{}' is not declared on table '{}'",
            column,
            descriptor.table
        );
    }
    Ok(())
}

fn select_page_sql(
    descriptor: &EntityDescriptor,
    clause: &WhereClause,
    order_by: Option<OrderBy>,
) -> Result<String> {
    let order = match order_by {
        Some(OrderBy { column, order }) => {
            ensure_declared(descriptor, column)?;
            format!(" ORDER BY {} {}", column, order.as_sql())
        }
        None => String::new(),
    };

    Ok(format!(
        "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
        descriptor.select_list(),
        descriptor.table,
        clause.sql,
        order
    ))
}

/// Primary-key match, restricted to live rows unless asked otherwise
fn by_id_clause(descriptor: &EntityDescriptor, id: i64, include_soft_deleted: bool) -> WhereClause {
    let mut predicates = vec![Filter::eq(descriptor.primary_key, SqlValue::BigInt(id))];
    if let (false, Some(column)) = (include_soft_deleted, descriptor.deleted_at_column()) {
        predicates.push(Filter::IsNull(column));
    }
    render_where(Filter::all(predicates).as_ref())
}

fn insert_sql(descriptor: &EntityDescriptor, values: &[(&'static str, SqlValue)]) -> Result<String> {
    if values.is_empty() {
        bail!("Nothing to insert into '{}'", descriptor.table);
    }
    for (column, _) in values {
        ensure_declared(descriptor, column)?;
    }

    let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        descriptor.table,
        columns.join(", "),
        placeholders
    ))
}

fn update_statement(
    descriptor: &EntityDescriptor,
    id: i64,
    values: &[(&'static str, SqlValue)],
    expected_version: Option<i64>,
) -> Result<(String, Vec<SqlValue>)> {
    let mut assignments = Vec::with_capacity(values.len() + 1);
    let mut params = Vec::with_capacity(values.len() + 2);
    for (column, value) in values {
        ensure_declared(descriptor, column)?;
        assignments.push(format!("{} = ?", column));
        params.push(value.clone());
    }

    let mut predicates = vec![Filter::eq(descriptor.primary_key, SqlValue::BigInt(id))];
    if let Some(column) = descriptor.deleted_at_column() {
        predicates.push(Filter::IsNull(column));
    }
    match (descriptor.version_column, expected_version) {
        (Some(column), Some(version)) => {
            assignments.push(format!("{0} = {0} + 1", column));
            predicates.push(Filter::eq(column, SqlValue::Integer(version)));
        }
        (None, Some(_)) => bail!("Table '{}' has no version column", descriptor.table),
        (_, None) => {}
    }

    if assignments.is_empty() {
        bail!("Nothing to update on '{}'", descriptor.table);
    }

    let clause = render_where(Filter::all(predicates).as_ref());
    params.extend(clause.params);
    let sql = format!(
        "UPDATE {} SET {}{}",
        descriptor.table,
        assignments.join(", "),
        clause.sql
    );
    Ok((sql, params))
}
