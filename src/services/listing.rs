//! Paginated list service
//!
//! Turns a pagination request plus an optional filter into one page of
//! serialized rows and the metadata describing the whole result set.
//! Storage errors propagate to the caller untouched.

use anyhow::Result;
use std::sync::Arc;

use crate::db::entity::{Entity, SortColumn};
use crate::db::filter::{render_where, Filter};
use crate::db::repositories::{OrderBy, RecordRepository};
use crate::models::{PaginatedEnvelope, PaginationMeta, PaginationRequest};
use crate::services::serializer::serialize_bigint_safe;

pub struct ListService {
    repo: Arc<dyn RecordRepository>,
}

impl ListService {
    pub fn new(repo: Arc<dyn RecordRepository>) -> Self {
        Self { repo }
    }

    /// List one page of `E`.
    ///
    /// Soft-deleted rows are excluded unless `include_soft_deleted` is set.
    /// The data and count queries share one rendered predicate and run
    /// concurrently. Without a sort column the row order is whatever the
    /// engine returns.
    pub async fn find_all_paginated<E: Entity>(
        &self,
        request: &PaginationRequest<E::Sort>,
        extra_filter: Option<Filter>,
        include_soft_deleted: bool,
    ) -> Result<PaginatedEnvelope> {
        let descriptor = E::descriptor();
        let pagination = request.normalize();

        let mut predicates = Vec::new();
        if let (false, Some(column)) = (include_soft_deleted, descriptor.deleted_at_column()) {
            predicates.push(Filter::IsNull(column));
        }
        predicates.extend(extra_filter);
        let clause = render_where(Filter::all(predicates).as_ref());

        let order_by = request.sort_by.map(|sort| OrderBy {
            column: sort.column(),
            order: request.sort_order,
        });

        let (rows, total_items) = futures::try_join!(
            self.repo.find_page(
                descriptor,
                &clause,
                order_by,
                pagination.limit,
                pagination.offset
            ),
            self.repo.count(descriptor, &clause),
        )?;

        Ok(PaginatedEnvelope {
            success: true,
            data: rows.iter().map(serialize_bigint_safe).collect(),
            meta: PaginationMeta::compute(total_items, pagination.page, pagination.limit),
        })
    }
}
