//! Rank model
//!
//! Ranks are the skill tiers of one game (Bronze, Silver, ...). `position`
//! orders them from lowest to highest.

use serde::Deserialize;

use super::game::GAMES;
use super::resource::{ColumnValues, QueryFilter, RecordInput, Reference, Resource};
use super::validation::{deserialize_id, int_in_range, required_text, ValidationError};
use crate::db::entity::{ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy};
use crate::db::value::SqlValue;

const MAX_POSITION: i64 = 10_000;

pub static RANKS: EntityDescriptor = EntityDescriptor {
    table: "ranks",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("game_id", "gameId", ColumnKind::BigInt),
        ColumnDef::new("name", "name", ColumnKind::Text),
        ColumnDef::new("position", "position", ColumnKind::Integer),
        ColumnDef::new("created_at", "createdAt", ColumnKind::Timestamp),
        ColumnDef::new("updated_at", "updatedAt", ColumnKind::Timestamp),
    ],
    deletion: Deletion::HardDeleteOnly,
    id_strategy: IdStrategy::AutoIncrement,
    version_column: None,
};

crate::sort_columns! {
    pub enum RankSort {
        Id => ("id", "id"),
        Name => ("name", "name"),
        Position => ("position", "position"),
    }
}

static FILTERS: [QueryFilter; 1] = [QueryFilter {
    param: "gameId",
    column: "game_id",
}];

static REFERENCES: [Reference; 1] = [Reference {
    column: "game_id",
    field: "gameId",
    target: &GAMES,
}];

pub struct Rank;

impl Entity for Rank {
    type Sort = RankSort;

    fn descriptor() -> &'static EntityDescriptor {
        &RANKS
    }
}

impl Resource for Rank {
    const NAME: &'static str = "Rank";
    type Create = CreateRankInput;
    type Update = UpdateRankInput;

    fn filters() -> &'static [QueryFilter] {
        &FILTERS
    }

    fn references() -> &'static [Reference] {
        &REFERENCES
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRankInput {
    #[serde(deserialize_with = "deserialize_id")]
    pub game_id: i64,
    pub name: String,
    #[serde(default)]
    pub position: i64,
}

impl RecordInput for CreateRankInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        Ok(vec![
            ("game_id", SqlValue::BigInt(self.game_id)),
            ("name", required_text("name", &self.name, 1, 100)?.into()),
            (
                "position",
                SqlValue::Integer(int_in_range("position", self.position, 0..=MAX_POSITION)?),
            ),
        ])
    }
}

/// A rank cannot move to another game
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRankInput {
    pub name: Option<String>,
    pub position: Option<i64>,
}

impl RecordInput for UpdateRankInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        let mut values = ColumnValues::new();
        if let Some(name) = self.name {
            values.push(("name", required_text("name", &name, 1, 100)?.into()));
        }
        if let Some(position) = self.position {
            let position = int_in_range("position", position, 0..=MAX_POSITION)?;
            values.push(("position", SqlValue::Integer(position)));
        }
        Ok(values)
    }
}
