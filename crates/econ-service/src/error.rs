use econ_db::StoreError;
use econ_progress::{PendingCommit, ProgressError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
}

impl ServiceError {
    /// Whether the same call may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Progress(_) | Self::Config(_) => false,
        }
    }
}

/// A lesson commit that did not reach the store.
///
/// Hands the pending commit back so it can be retried as is; its commit id
/// keeps a retry from counting the lesson twice.
#[derive(Error, Debug)]
#[error("Failed to commit lesson {}: {source}", .pending.summary.lesson_id)]
pub struct CommitError {
    pub pending: PendingCommit,
    pub source: ServiceError,
}

impl CommitError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    pub fn into_pending(self) -> PendingCommit {
        self.pending
    }
}
