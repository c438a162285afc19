//! Platform model

use serde::Deserialize;

use super::resource::{ColumnValues, RecordInput, Resource};
use super::validation::{required_text, ValidationError};
use crate::db::entity::{ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy};

const NAME_MAX_LEN: usize = 100;

pub static PLATFORMS: EntityDescriptor = EntityDescriptor {
    table: "platforms",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("name", "name", ColumnKind::Text),
        ColumnDef::new("created_at", "createdAt", ColumnKind::Timestamp),
        ColumnDef::new("updated_at", "updatedAt", ColumnKind::Timestamp),
    ],
    deletion: Deletion::HardDeleteOnly,
    id_strategy: IdStrategy::AutoIncrement,
    version_column: None,
};

crate::sort_columns! {
    pub enum PlatformSort {
        Id => ("id", "id"),
        Name => ("name", "name"),
    }
}

/// Gaming platform (PC, console, mobile)
pub struct Platform;

impl Entity for Platform {
    type Sort = PlatformSort;

    fn descriptor() -> &'static EntityDescriptor {
        &PLATFORMS
    }
}

impl Resource for Platform {
    const NAME: &'static str = "Platform";
    type Create = PlatformInput;
    type Update = PlatformInput;
}

/// Body of both create and update
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformInput {
    pub name: String,
}

impl RecordInput for PlatformInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        let name = required_text("name", &self.name, 1, NAME_MAX_LEN)?;
        Ok(vec![("name", name.into())])
    }
}
