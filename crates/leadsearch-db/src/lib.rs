//! SQLite persistence for runs, leads, and the cross-run lead cache.

mod store;

use thiserror::Error;

pub use store::SqliteStore;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode failure: {0}")]
    Encode(#[from] serde_json::Error),

    /// A cache row whose stored JSON or run ids no longer parse.
    #[error("corrupt cache entry {key}: {reason}")]
    CorruptCacheEntry { key: String, reason: String },
}
