use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a `LEADSEARCH_*` value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a `LEADSEARCH_*` value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("LEADSEARCH_LOG_LEVEL", "info");
    let user_agent = or_default(
        "LEADSEARCH_USER_AGENT",
        "leadsearch/0.1 (local lead discovery)",
    );
    let worker_pool_size = parse_usize("LEADSEARCH_WORKER_POOL_SIZE", "2")?;
    let fetch_timeout_secs = parse_u64("LEADSEARCH_FETCH_TIMEOUT_SECS", "30")?;
    let retry_max_attempts = parse_u32("LEADSEARCH_RETRY_MAX_ATTEMPTS", "3")?;
    let retry_base_delay_ms = parse_u64("LEADSEARCH_RETRY_BASE_DELAY_MS", "500")?;
    let retry_backoff_multiplier = parse_f64("LEADSEARCH_RETRY_BACKOFF_MULTIPLIER", "2.0")?;
    let throttle_min_ms = parse_u64("LEADSEARCH_THROTTLE_MIN_MS", "400")?;
    let throttle_max_ms = parse_u64("LEADSEARCH_THROTTLE_MAX_MS", "1200")?;
    let llm_timeout_secs = parse_u64("LEADSEARCH_LLM_TIMEOUT_SECS", "30")?;

    if throttle_max_ms < throttle_min_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "LEADSEARCH_THROTTLE_MAX_MS".to_string(),
            reason: format!("must be >= LEADSEARCH_THROTTLE_MIN_MS ({throttle_min_ms})"),
        });
    }

    Ok(AppConfig {
        log_level,
        user_agent,
        worker_pool_size,
        fetch_timeout_secs,
        retry_max_attempts,
        retry_base_delay_ms,
        retry_backoff_multiplier,
        throttle_min_ms,
        throttle_max_ms,
        llm_timeout_secs,
    })
}
