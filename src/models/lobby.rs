//! Lobby model
//!
//! Lobbies are player-created rooms for one game. Updates are guarded by
//! `row_version`: the client sends the version it read and the write only
//! applies if nobody changed the row in between.

use serde::Deserialize;

use super::game::GAMES;
use super::language::LANGUAGES;
use super::platform::PLATFORMS;
use super::resource::{ColumnValues, QueryFilter, RecordInput, Reference, Resource};
use super::validation::{
    deserialize_id, deserialize_nullable, deserialize_nullable_id, deserialize_optional_id,
    int_in_range, optional_text, required_text, ValidationError,
};
use crate::db::entity::{ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy};
use crate::db::value::SqlValue;

pub const MIN_PLAYERS: i64 = 2;
pub const MAX_PLAYERS: i64 = 128;

const TITLE_MAX_LEN: usize = 150;
const DESCRIPTION_MAX_LEN: usize = 2000;

pub static LOBBIES: EntityDescriptor = EntityDescriptor {
    table: "lobbies",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("game_id", "gameId", ColumnKind::BigInt),
        ColumnDef::new("platform_id", "platformId", ColumnKind::BigInt),
        ColumnDef::new("language_id", "languageId", ColumnKind::BigInt),
        ColumnDef::new("title", "title", ColumnKind::Text),
        ColumnDef::new("description", "description", ColumnKind::Text),
        ColumnDef::new("max_players", "maxPlayers", ColumnKind::Integer),
        ColumnDef::new("row_version", "rowVersion", ColumnKind::Integer),
        ColumnDef::new("created_at", "createdAt", ColumnKind::Timestamp),
        ColumnDef::new("updated_at", "updatedAt", ColumnKind::Timestamp),
        ColumnDef::new("deleted_at", "deletedAt", ColumnKind::Timestamp),
    ],
    deletion: Deletion::SoftDeletable {
        deleted_at_column: "deleted_at",
    },
    id_strategy: IdStrategy::Snowflake,
    version_column: Some("row_version"),
};

crate::sort_columns! {
    pub enum LobbySort {
        Id => ("id", "id"),
        Title => ("title", "title"),
        CreatedAt => ("createdAt", "created_at"),
        MaxPlayers => ("maxPlayers", "max_players"),
    }
}

static FILTERS: [QueryFilter; 3] = [
    QueryFilter {
        param: "gameId",
        column: "game_id",
    },
    QueryFilter {
        param: "platformId",
        column: "platform_id",
    },
    QueryFilter {
        param: "languageId",
        column: "language_id",
    },
];

static REFERENCES: [Reference; 3] = [
    Reference {
        column: "game_id",
        field: "gameId",
        target: &GAMES,
    },
    Reference {
        column: "platform_id",
        field: "platformId",
        target: &PLATFORMS,
    },
    Reference {
        column: "language_id",
        field: "languageId",
        target: &LANGUAGES,
    },
];

pub struct Lobby;

impl Entity for Lobby {
    type Sort = LobbySort;

    fn descriptor() -> &'static EntityDescriptor {
        &LOBBIES
    }
}

impl Resource for Lobby {
    const NAME: &'static str = "Lobby";
    type Create = CreateLobbyInput;
    type Update = UpdateLobbyInput;

    fn filters() -> &'static [QueryFilter] {
        &FILTERS
    }

    fn references() -> &'static [Reference] {
        &REFERENCES
    }
}

fn max_players(value: i64) -> Result<SqlValue, ValidationError> {
    int_in_range("maxPlayers", value, MIN_PLAYERS..=MAX_PLAYERS).map(SqlValue::Integer)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyInput {
    #[serde(deserialize_with = "deserialize_id")]
    pub game_id: i64,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub platform_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub language_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub max_players: i64,
}

impl RecordInput for CreateLobbyInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        Ok(vec![
            ("game_id", SqlValue::BigInt(self.game_id)),
            ("platform_id", self.platform_id.map(SqlValue::BigInt).into()),
            ("language_id", self.language_id.map(SqlValue::BigInt).into()),
            ("title", required_text("title", &self.title, 1, TITLE_MAX_LEN)?.into()),
            (
                "description",
                optional_text("description", self.description.as_deref(), DESCRIPTION_MAX_LEN)?
                    .into(),
            ),
            ("max_players", max_players(self.max_players)?),
        ])
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLobbyInput {
    pub title: Option<String>,
    /// `Some(None)` clears the column, likewise for the two ids
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub description: Option<Option<String>>,
    pub max_players: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_nullable_id")]
    pub platform_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_nullable_id")]
    pub language_id: Option<Option<i64>>,
    /// Version the client last read
    pub row_version: i64,
}

impl RecordInput for UpdateLobbyInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        let mut values = ColumnValues::new();
        if let Some(title) = self.title {
            values.push(("title", required_text("title", &title, 1, TITLE_MAX_LEN)?.into()));
        }
        if let Some(description) = self.description {
            let description =
                optional_text("description", description.as_deref(), DESCRIPTION_MAX_LEN)?;
            values.push(("description", description.into()));
        }
        if let Some(value) = self.max_players {
            values.push(("max_players", max_players(value)?));
        }
        if let Some(platform_id) = self.platform_id {
            values.push(("platform_id", platform_id.map(SqlValue::BigInt).into()));
        }
        if let Some(language_id) = self.language_id {
            values.push(("language_id", language_id.map(SqlValue::BigInt).into()));
        }
        Ok(values)
    }

    fn expected_version(&self) -> Option<i64> {
        Some(self.row_version)
    }
}
