//! Run pipeline: scoring, cross-run dedup, and the coordinator that wires
//! the stages together.

mod cache;
mod error;
mod run;
mod scorer;
mod sink;

pub use cache::{reconcile, ReconcileOutcome};
pub use error::RunError;
pub use run::{run, RunDeps, RunOutcome};
pub use scorer::{add_llm_rationales, score, ScoreWeights};
pub use sink::{PersistReceipt, PersistenceSink, SinkError};
