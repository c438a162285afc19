//! Database repositories
//!
//! Repository pattern implementations for database access. A single
//! descriptor-driven repository serves every resource table.

pub mod record;

pub use record::{OrderBy, RecordRepository, SqlxRecordRepository};
