//! Pagination types
//!
//! Request parameters, the normalisation step that turns untrusted input into
//! bounded values, and the `{ success, data, meta }` envelope returned by list
//! endpoints.

use serde::{Deserialize, Serialize};

use crate::db::entity::SortOrder;

/// Page size used when the client doesn't supply one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound for any requested page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters as parsed from the request, before normalisation.
///
/// `S` is the resource's sortable-column enum; an unknown sort field never
/// makes it this far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationRequest<S> {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<S>,
    pub sort_order: SortOrder,
}

impl<S> Default for PaginationRequest<S> {
    fn default() -> Self {
        Self {
            page: None,
            limit: None,
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }
}

impl<S> PaginationRequest<S> {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, column: S, order: SortOrder) -> Self {
        self.sort_by = Some(column);
        self.sort_order = order;
        self
    }

    pub fn normalize(&self) -> NormalizedPagination {
        normalize_pagination(self.page, self.limit)
    }
}

/// Bounded pagination values safe to hand to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedPagination {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Normalise untrusted page/limit input.
///
/// Never fails: malformed input degrades to the defaults instead of
/// rejecting the request. A missing or zero value counts as not supplied.
/// Page is at least 1; limit is clamped to `[1, MAX_PAGE_SIZE]`.
pub fn normalize_pagination(page: Option<i64>, limit: Option<i64>) -> NormalizedPagination {
    let page = supplied(page).unwrap_or(1).max(1);
    let limit = supplied(limit)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(limit);

    NormalizedPagination {
        page,
        limit,
        offset,
    }
}

fn supplied(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v != 0)
}

/// Parse a raw query-string number. Anything that isn't an integer is
/// treated as absent.
pub fn parse_page_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Metadata describing the full result set behind one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn compute(total_items: i64, page: i64, limit: i64) -> Self {
        let total_items = total_items.max(0);
        let total_pages = if limit > 0 {
            (total_items + limit - 1) / limit
        } else {
            0
        };

        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

/// Response envelope for list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedEnvelope {
    pub success: bool,
    pub data: Vec<serde_json::Value>,
    pub meta: PaginationMeta,
}
