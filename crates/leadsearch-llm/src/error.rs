use thiserror::Error;

/// Failures of the single configured provider. Provider messages are carried
/// verbatim so operators see exactly what the endpoint said.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-success HTTP status from the provider, body untouched.
    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered 200 but the payload is not the expected chat
    /// completion shape, or the extraction content is not valid JSON.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}
