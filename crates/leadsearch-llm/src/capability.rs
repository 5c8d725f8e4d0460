use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LlmError;

/// One lead as returned by the structured-extraction call. Every field is
/// optional; the extractor decides what a usable candidate needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmLead {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_title: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// The language-model capability the pipeline depends on.
///
/// Exactly one provider/model backs an implementation; callers must treat
/// every error as "degrade to heuristics", never as "try elsewhere".
#[async_trait]
pub trait LlmCapability: Send + Sync {
    /// Structured lead extraction from page text.
    async fn extract_leads(&self, source: &str, text: &str) -> Result<Vec<LlmLead>, LlmError>;

    /// Short free-text scoring rationale for one lead summary.
    async fn rationale(&self, lead_summary: &str) -> Result<String, LlmError>;
}
