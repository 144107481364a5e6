use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Incident, IncidentGuidance, IncidentGuidanceStep, IncidentId, IncidentMedia, StepId, UserId,
};

/// Result type for relational store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a relational store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("step already completed: {id}")]
    AlreadyCompleted { id: String },

    #[error("constraint violated: {message}")]
    Conflict { message: String },

    #[error("storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn not_found<S: Into<String>>(entity: &'static str, id: S) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_completed(&self) -> bool {
        matches!(self, StoreError::AlreadyCompleted { .. })
    }
}

/// Relational ledger of incidents, guidance steps and incident media.
///
/// Incidents and guidance assignments are provisioned elsewhere; the
/// mission workflow only reads them, flips step completion and appends
/// media rows.
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Point lookup of a guidance step.
    async fn get_step_by_id(&self, id: &StepId) -> StoreResult<IncidentGuidanceStep>;

    /// Latch one step to completed at `completed_at`.
    ///
    /// The check and the write are a single atomic step: a step that is
    /// already completed is left untouched and `AlreadyCompleted` is
    /// returned, so concurrent callers cannot both succeed.
    async fn update_step_completed(&self, id: &StepId, completed_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Point lookup of an incident.
    async fn get_incident_by_id(&self, id: &IncidentId) -> StoreResult<Incident>;

    /// Insert all media rows in a single write.
    async fn batch_insert_media(&self, media: &[IncidentMedia]) -> StoreResult<()>;

    /// Every guidance assigned to `assignee`, with steps, in creation order.
    async fn get_guidance_by_assignee(&self, assignee: &UserId) -> StoreResult<Vec<IncidentGuidance>>;
}
