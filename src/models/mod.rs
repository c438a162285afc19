//! Data models
//!
//! Pagination types, the resource definitions (descriptor, sortable columns,
//! accepted inputs) and the validation helpers those inputs share.

mod game;
mod language;
mod lobby;
pub mod pagination;
mod platform;
mod rank;
pub mod resource;
pub mod validation;

pub use game::{CreateGameInput, Game, GameSort, UpdateGameInput, GAMES};
pub use language::{CreateLanguageInput, Language, LanguageSort, UpdateLanguageInput, LANGUAGES};
pub use lobby::{
    CreateLobbyInput, Lobby, LobbySort, UpdateLobbyInput, LOBBIES, MAX_PLAYERS, MIN_PLAYERS,
};
pub use pagination::{
    normalize_pagination, parse_page_param, NormalizedPagination, PaginatedEnvelope,
    PaginationMeta, PaginationRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use platform::{Platform, PlatformInput, PlatformSort, PLATFORMS};
pub use rank::{CreateRankInput, Rank, RankSort, UpdateRankInput, RANKS};
pub use resource::{filter_from_params, ColumnValues, QueryFilter, RecordInput, Reference, Resource};
pub use validation::ValidationError;
