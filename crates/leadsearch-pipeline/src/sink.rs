//! The persistence boundary the coordinator writes through.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use leadsearch_core::{CacheSnapshot, RunMetadata, ScoredLead};

/// Persistence failures. A failed final commit is fatal for the run; the
/// in-memory results are still surfaced to the caller.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// What a successful commit wrote and where.
#[derive(Debug, Clone, Serialize)]
pub struct PersistReceipt {
    pub rows_written: usize,
    pub db_path: String,
    pub json_path: Option<String>,
}

/// Durable storage for run results and the cross-run lead cache.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Commits the run: leads, metadata, and the reconciled cache, as one
    /// transaction. Partial writes must not survive a failure.
    async fn persist(
        &self,
        leads: &[ScoredLead],
        metadata: &RunMetadata,
        cache: &CacheSnapshot,
    ) -> Result<PersistReceipt, SinkError>;

    /// The prior cache snapshot, empty on first run.
    async fn load_cache(&self) -> Result<CacheSnapshot, SinkError>;
}
