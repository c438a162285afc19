//! Game model

use serde::Deserialize;

use super::platform::PLATFORMS;
use super::resource::{ColumnValues, QueryFilter, RecordInput, Reference, Resource};
use super::validation::{
    deserialize_nullable, deserialize_nullable_id, deserialize_optional_id, optional_text,
    required_text, ValidationError,
};
use crate::db::entity::{ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy};
use crate::db::value::SqlValue;

const NAME_MAX_LEN: usize = 150;
const DESCRIPTION_MAX_LEN: usize = 2000;

pub static GAMES: EntityDescriptor = EntityDescriptor {
    table: "games",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("name", "name", ColumnKind::Text),
        ColumnDef::new("description", "description", ColumnKind::Text),
        ColumnDef::new("platform_id", "platformId", ColumnKind::BigInt),
        ColumnDef::new("created_at", "createdAt", ColumnKind::Timestamp),
        ColumnDef::new("updated_at", "updatedAt", ColumnKind::Timestamp),
        ColumnDef::new("deleted_at", "deletedAt", ColumnKind::Timestamp),
    ],
    deletion: Deletion::SoftDeletable {
        deleted_at_column: "deleted_at",
    },
    id_strategy: IdStrategy::Snowflake,
    version_column: None,
};

crate::sort_columns! {
    pub enum GameSort {
        Id => ("id", "id"),
        Name => ("name", "name"),
        CreatedAt => ("createdAt", "created_at"),
    }
}

static FILTERS: [QueryFilter; 1] = [QueryFilter {
    param: "platformId",
    column: "platform_id",
}];

static REFERENCES: [Reference; 1] = [Reference {
    column: "platform_id",
    field: "platformId",
    target: &PLATFORMS,
}];

pub struct Game;

impl Entity for Game {
    type Sort = GameSort;

    fn descriptor() -> &'static EntityDescriptor {
        &GAMES
    }
}

impl Resource for Game {
    const NAME: &'static str = "Game";
    type Create = CreateGameInput;
    type Update = UpdateGameInput;

    fn filters() -> &'static [QueryFilter] {
        &FILTERS
    }

    fn references() -> &'static [Reference] {
        &REFERENCES
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub platform_id: Option<i64>,
}

impl RecordInput for CreateGameInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        Ok(vec![
            ("name", required_text("name", &self.name, 1, NAME_MAX_LEN)?.into()),
            (
                "description",
                optional_text("description", self.description.as_deref(), DESCRIPTION_MAX_LEN)?
                    .into(),
            ),
            ("platform_id", self.platform_id.map(SqlValue::BigInt).into()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameInput {
    pub name: Option<String>,
    /// `Some(None)` clears the column
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable_id")]
    pub platform_id: Option<Option<i64>>,
}

impl RecordInput for UpdateGameInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        let mut values = ColumnValues::new();
        if let Some(name) = self.name {
            values.push(("name", required_text("name", &name, 1, NAME_MAX_LEN)?.into()));
        }
        if let Some(description) = self.description {
            let description =
                optional_text("description", description.as_deref(), DESCRIPTION_MAX_LEN)?;
            values.push(("description", description.into()));
        }
        if let Some(platform_id) = self.platform_id {
            values.push(("platform_id", platform_id.map(SqlValue::BigInt).into()));
        }
        Ok(values)
    }
}
