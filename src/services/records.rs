//! Record service
//!
//! Single-row reads and writes for every resource: validation of typed
//! inputs, foreign-key checks, id and timestamp assignment, optimistic
//! locking and the soft/hard delete decision.

use anyhow::anyhow;
use chrono::Utc;
use std::sync::Arc;

use crate::db::entity::IdStrategy;
use crate::db::repositories::RecordRepository;
use crate::db::value::{Record, SqlValue};
use crate::models::{ColumnValues, RecordInput, Resource, ValidationError};
use crate::services::id_generator::IdGenerator;

/// Error types for record service operations
#[derive(Debug, thiserror::Error)]
pub enum RecordServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Optimistic-lock mismatch or duplicate key
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for RecordServiceError {
    fn from(err: ValidationError) -> Self {
        RecordServiceError::Validation(err.to_string())
    }
}

pub struct RecordService {
    repo: Arc<dyn RecordRepository>,
    ids: Arc<IdGenerator>,
}

impl RecordService {
    pub fn new(repo: Arc<dyn RecordRepository>, ids: Arc<IdGenerator>) -> Self {
        Self { repo, ids }
    }

    fn not_found<R: Resource>(id: i64) -> RecordServiceError {
        RecordServiceError::NotFound(format!("{} not found: {}", R::NAME, id))
    }

    /// Fetch a live row
    pub async fn get<R: Resource>(&self, id: i64) -> Result<Record, RecordServiceError> {
        self.repo
            .find_by_id(R::descriptor(), id, false)
            .await?
            .ok_or_else(|| Self::not_found::<R>(id))
    }

    pub async fn create<R: Resource>(&self, input: R::Create) -> Result<Record, RecordServiceError> {
        let descriptor = R::descriptor();
        let mut values = input.into_values()?;
        self.check_references::<R>(&values).await?;

        if descriptor.id_strategy == IdStrategy::Snowflake {
            let id = self.ids.next_id().await.map_err(anyhow::Error::from)?;
            values.insert(0, (descriptor.primary_key, SqlValue::BigInt(id)));
        }
        let now = Utc::now();
        for column in ["created_at", "updated_at"] {
            if descriptor.has_column(column) {
                values.push((column, now.into()));
            }
        }

        let id = self
            .repo
            .insert(descriptor, &values)
            .await
            .map_err(duplicate_as_conflict::<R>)?;
        let created = self
            .repo
            .find_by_id(descriptor, id, true)
            .await?
            .ok_or_else(|| anyhow!("{} {} vanished after insert", R::NAME, id))?;
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// For tables with a version column the write is compare-and-increment:
    /// a stale version yields `Conflict`, a missing row `NotFound`.
    pub async fn update<R: Resource>(
        &self,
        id: i64,
        input: R::Update,
    ) -> Result<Record, RecordServiceError> {
        let descriptor = R::descriptor();
        let expected_version = input.expected_version();
        if descriptor.version_column.is_some() && expected_version.is_none() {
            return Err(RecordServiceError::Validation(
                "rowVersion is required".to_string(),
            ));
        }

        let mut values = input.into_values()?;
        if values.is_empty() && descriptor.version_column.is_none() {
            return Err(RecordServiceError::Validation(
                "no fields to update".to_string(),
            ));
        }
        self.check_references::<R>(&values).await?;
        if descriptor.has_column("updated_at") {
            values.push(("updated_at", Utc::now().into()));
        }

        let changed = self
            .repo
            .update(descriptor, id, &values, expected_version)
            .await
            .map_err(duplicate_as_conflict::<R>)?;
        if changed == 0 {
            return Err(if self.repo.exists(descriptor, id, false).await? {
                RecordServiceError::Conflict(format!(
                    "{} {} was modified by another request",
                    R::NAME,
                    id
                ))
            } else {
                Self::not_found::<R>(id)
            });
        }

        self.get::<R>(id).await
    }

    /// Soft delete when the table supports it, hard delete otherwise
    pub async fn delete<R: Resource>(&self, id: i64) -> Result<(), RecordServiceError> {
        let descriptor = R::descriptor();
        let deleted = if descriptor.is_soft_deletable() {
            self.repo.soft_delete(descriptor, id, Utc::now()).await?
        } else {
            self.repo.hard_delete(descriptor, id).await?
        };

        if deleted {
            Ok(())
        } else {
            Err(Self::not_found::<R>(id))
        }
    }

    /// Every non-null foreign key in `values` must point at a live row
    async fn check_references<R: Resource>(
        &self,
        values: &ColumnValues,
    ) -> Result<(), RecordServiceError> {
        for reference in R::references() {
            let target_id = values
                .iter()
                .find(|(column, _)| *column == reference.column)
                .and_then(|(_, value)| value.as_i64());

            if let Some(target_id) = target_id {
                if !self.repo.exists(reference.target, target_id, false).await? {
                    return Err(ValidationError::new(
                        reference.field,
                        format!("no {} with id {}", reference.target.table, target_id),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Map unique-constraint violations to `Conflict`
fn duplicate_as_conflict<R: Resource>(err: anyhow::Error) -> RecordServiceError {
    let duplicate = matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    );
    if duplicate {
        RecordServiceError::Conflict(format!("{} already exists", R::NAME))
    } else {
        RecordServiceError::Internal(err)
    }
}
