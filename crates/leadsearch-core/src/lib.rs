pub mod app_config;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod request;

pub use app_config::AppConfig;
pub use cache::{CacheEntry, CacheKey, CacheSnapshot, CacheStats};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ErrorRecord, Stage};
pub use models::{
    FetchStatus, LeadCandidate, Provenance, RunMetadata, RunStats, ScoredLead, ScrapeArtifact,
    Sourced, StrategyStep,
};
pub use request::{LlmSettings, SearchFilters, SearchRequest, StorageSettings};
