pub mod anti_detection;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod planner;
pub mod retry;
pub mod sources;

pub use anti_detection::AntiDetectionConfig;
pub use error::{FetchError, PlanError};
pub use fetch::{Allowance, FetchCapability, FetchedPage, FetchOptions, PreloadedFetcher};
pub use orchestrator::{execute, CancelFlag, ScrapeOutcome};
pub use planner::{plan, Plan};
pub use retry::{CaptchaPolicy, RetryPolicy};
pub use sources::{SourceRegistry, SourceSpec};
