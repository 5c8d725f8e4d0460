//! Run request payload: the JSON document that starts a search run.
//!
//! Payloads are flexible: unknown fields are ignored and everything has a
//! default, so callers can supply only what they care about. A request is
//! immutable once a run starts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Single-provider LLM settings. No fallback provider exists anywhere in the
/// system: whatever is configured here is the only model ever called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            top_p: default_top_p(),
            max_tokens: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_top_p() -> f64 {
    1.0
}

/// Filter predicate applied at scoring time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub must_have_email: bool,
    #[serde(default)]
    pub must_have_phone: bool,
}

/// Where run output lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default)]
    pub json_export: bool,
    #[serde(default)]
    pub json_path: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            json_export: false,
            json_path: None,
        }
    }
}

fn default_sqlite_path() -> String {
    "./data/lead_search.db".to_string()
}

/// A complete search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_pages_per_source")]
    pub pages_per_source: u32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub use_llm_extraction: bool,
    #[serde(default = "default_true")]
    pub anti_detection: bool,
    #[serde(default)]
    pub capture_screenshots: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        // serde defaults and Default must agree; route through an empty object.
        serde_json::from_value(serde_json::json!({})).expect("empty payload always deserializes")
    }
}

fn default_sources() -> Vec<String> {
    vec!["google_maps".to_string()]
}

fn default_pages_per_source() -> u32 {
    3
}

fn default_max_results() -> usize {
    50
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl SearchRequest {
    /// Parses a request from a raw JSON payload. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedPayload`] when a known field has the
    /// wrong shape (e.g. `keywords` is not an array of strings).
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(payload).map_err(|e| ConfigError::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_payload_uses_defaults() {
        let req = SearchRequest::from_payload(json!({})).unwrap();
        assert!(req.keywords.is_empty());
        assert_eq!(req.sources, vec!["google_maps"]);
        assert_eq!(req.pages_per_source, 3);
        assert_eq!(req.max_results, 50);
        assert_eq!(req.timeout_seconds, 30);
        assert!(!req.use_llm_extraction);
        assert!(req.anti_detection);
        assert_eq!(req.llm.provider, "openai");
        assert_eq!(req.llm.model, "gpt-4.1-mini");
        assert!((req.llm.top_p - 1.0).abs() < f64::EPSILON);
        assert_eq!(req.storage.sqlite_path, "./data/lead_search.db");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req = SearchRequest::from_payload(json!({
            "keywords": ["plumber"],
            "passthrough": {"anything": true},
            "some_future_field": 42
        }))
        .unwrap();
        assert_eq!(req.keywords, vec!["plumber"]);
    }

    #[test]
    fn malformed_known_field_is_rejected() {
        let result = SearchRequest::from_payload(json!({"keywords": "not-an-array"}));
        assert!(matches!(result, Err(ConfigError::MalformedPayload(_))));
    }

    #[test]
    fn nested_filters_parse() {
        let req = SearchRequest::from_payload(json!({
            "filters": {"categories": ["hvac"], "must_have_phone": true}
        }))
        .unwrap();
        assert_eq!(req.filters.categories, vec!["hvac"]);
        assert!(req.filters.must_have_phone);
        assert!(!req.filters.must_have_email);
    }

    #[test]
    fn llm_settings_override_defaults() {
        let req = SearchRequest::from_payload(json!({
            "llm": {
                "provider": "local",
                "model": "llama-3-8b",
                "base_url": "http://localhost:8080",
                "api_key": "sk-test",
                "temperature": 0.2
            }
        }))
        .unwrap();
        assert_eq!(req.llm.provider, "local");
        assert_eq!(req.llm.model, "llama-3-8b");
        assert_eq!(req.llm.base_url.as_deref(), Some("http://localhost:8080"));
        assert!((req.llm.temperature - 0.2).abs() < f64::EPSILON);
    }
}
