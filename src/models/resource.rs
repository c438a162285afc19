//! Resource definitions
//!
//! A resource is an [`Entity`] plus the typed inputs accepted by its write
//! endpoints, the query parameters it can be filtered by, and the
//! foreign keys that must point at live rows.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use super::validation::{parse_id, ValidationError};
use crate::db::entity::{Entity, EntityDescriptor};
use crate::db::filter::Filter;
use crate::db::value::SqlValue;

/// Column/value pairs produced by a validated input
pub type ColumnValues = Vec<(&'static str, SqlValue)>;

/// A request body for a create or update
pub trait RecordInput: DeserializeOwned + Send + 'static {
    /// Validate and convert into the columns to write
    fn into_values(self) -> Result<ColumnValues, ValidationError>;

    /// Row version the client last saw, for tables with optimistic locking
    fn expected_version(&self) -> Option<i64> {
        None
    }
}

/// Foreign key checked before writes
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub column: &'static str,
    pub field: &'static str,
    pub target: &'static EntityDescriptor,
}

/// Query parameter that filters a list by equality on an id column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter {
    pub param: &'static str,
    pub column: &'static str,
}

pub trait Resource: Entity {
    /// Human-readable name used in error messages
    const NAME: &'static str;

    type Create: RecordInput;
    type Update: RecordInput;

    fn filters() -> &'static [QueryFilter] {
        &[]
    }

    fn references() -> &'static [Reference] {
        &[]
    }
}

/// Build the extra list filter from raw query parameters.
///
/// Parameters the resource doesn't declare are ignored; a declared one
/// with a malformed id is rejected.
pub fn filter_from_params<R: Resource>(
    params: &HashMap<String, String>,
) -> Result<Option<Filter>, ValidationError> {
    let mut filters = Vec::new();
    for declared in R::filters() {
        if let Some(raw) = params.get(declared.param) {
            let id = parse_id(declared.param, raw)?;
            filters.push(Filter::eq(declared.column, SqlValue::BigInt(id)));
        }
    }
    Ok(Filter::all(filters))
}
