use thiserror::Error;

/// Failure modes of the external fetch capability.
///
/// `Timeout` and `ServerError` are transient and retried with backoff; the
/// rest are terminal for the step (or, for `Challenge` and
/// `CapabilityUnavailable`, for the whole source).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("upstream server error (status {status})")]
    ServerError { status: u16 },

    #[error("request blocked by target: {reason}")]
    Blocked { reason: String },

    #[error("interactive challenge detected")]
    Challenge,

    #[error("fetch capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// True for conditions worth retrying after a backoff delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ServerError { .. })
    }
}

/// Planning failures. All are configuration errors and abort the run before
/// any network activity.
// Implemented by hand because thiserror would treat the `source` field as the
// error's source, and `String` does not implement `std::error::Error`.
#[derive(Debug)]
pub enum PlanError {
    MissingTemplate { source: String },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTemplate { source } => {
                write!(f, "source '{source}' is registered without a query template")
            }
        }
    }
}

impl std::error::Error for PlanError {}
