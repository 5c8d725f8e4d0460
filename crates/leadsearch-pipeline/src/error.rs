use thiserror::Error;

use leadsearch_scraper::PlanError;

use crate::run::RunOutcome;
use crate::sink::SinkError;

/// Fatal run failures. Everything else lands on the run's error log.
/// Payload parsing fails before a run exists, so malformed payloads are the
/// caller's problem, not a `RunError`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The final commit failed. The in-memory results are attached so the
    /// caller can still inspect or re-submit them.
    #[error("final persistence commit failed: {error}")]
    Persist {
        #[source]
        error: SinkError,
        outcome: Box<RunOutcome>,
    },
}
