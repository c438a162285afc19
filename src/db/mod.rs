//! Database layer
//!
//! Storage access for the PlayHub backend. It supports:
//! - SQLite (default, and the engine tests run against)
//! - MySQL (for larger deployments)
//!
//! The driver is selected by configuration. Everything above the pool works
//! from static [`entity::EntityDescriptor`]s, so tables are described once
//! and queried through one generic repository.
//!
//! # Usage
//!
//! ```ignore
//! use playhub::config::DatabaseConfig;
//! use playhub::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod entity;
pub mod filter;
pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod value;

pub use entity::{
    ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy, SortColumn, SortOrder,
};
pub use filter::{render_where, Filter, WhereClause};
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
pub use value::{Record, SqlValue};
