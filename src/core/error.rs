//! Typed errors surfaced to callers.
//!
//! Tool failures and model-invocation failures are folded into structured
//! result values and never raised; persistence is the exception. Losing a
//! transcript or a task list silently is worse than a visible failure, so
//! store operations surface a [`StoreError`] instead of swallowing it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
