//! Query-string parsing shared by the list endpoints

use serde::Deserialize;

use crate::db::entity::{SortColumn, SortOrder};
use crate::models::{parse_page_param, PaginationRequest};

/// Raw list query parameters.
///
/// Everything is kept as text so malformed values degrade to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub include_deleted: Option<String>,
}

impl ListQuery {
    /// Unknown `sortBy` fields are dropped rather than rejected
    pub fn pagination<S: SortColumn>(&self) -> PaginationRequest<S> {
        PaginationRequest {
            page: parse_page_param(self.page.as_deref()),
            limit: parse_page_param(self.limit.as_deref()),
            sort_by: self.sort_by.as_deref().and_then(|f| S::from_field(f.trim())),
            sort_order: SortOrder::parse(self.sort_order.as_deref()),
        }
    }

    pub fn include_deleted(&self) -> bool {
        matches!(
            self.include_deleted.as_deref().map(str::trim),
            Some("true") | Some("1")
        )
    }
}
