/// Process-level configuration, read from `LEADSEARCH_*` env vars.
///
/// Everything here has a default so a bare environment works; the run
/// payload carries the per-run knobs (keywords, sources, storage, LLM).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// User-Agent handed to the fetch capability.
    pub user_agent: String,
    /// Bounded worker pool: number of sources scraped concurrently.
    pub worker_pool_size: usize,
    /// Per fetch attempt timeout.
    pub fetch_timeout_secs: u64,
    /// Retry attempts after the first failure for transient fetch errors.
    pub retry_max_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay_ms: u64,
    /// Backoff multiplier: delay before retry n is `base * multiplier^(n-1)`.
    pub retry_backoff_multiplier: f64,
    /// Throttle delay range steps are drawn from, in milliseconds.
    pub throttle_min_ms: u64,
    pub throttle_max_ms: u64,
    /// Per LLM call timeout.
    pub llm_timeout_secs: u64,
}
