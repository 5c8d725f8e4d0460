//! Chat-completions client for one OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leadsearch_core::LlmSettings;

use crate::capability::{LlmCapability, LlmLead};
use crate::error::LlmError;
use crate::prompts;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Client for `{base_url}/v1/chat/completions` with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl OpenAiCompatClient {
    /// Builds a client with a per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(settings: LlmSettings, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage<'_>>,
        json_object: bool,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            max_tokens: self.settings.max_tokens,
            response_format: json_object.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut builder = self.http.post(self.endpoint()).json(&request);
        if let Some(key) = self.settings.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::warn!(status = status.as_u16(), model = %self.settings.model, "provider call failed");
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response carried no choices".to_string()))
    }
}

#[async_trait]
impl LlmCapability for OpenAiCompatClient {
    async fn extract_leads(&self, source: &str, text: &str) -> Result<Vec<LlmLead>, LlmError> {
        let system = prompts::extraction_prompt(source);
        let content = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: &system,
                    },
                    ChatMessage {
                        role: "user",
                        content: text,
                    },
                ],
                true,
            )
            .await?;
        parse_extraction(&content)
    }

    async fn rationale(&self, lead_summary: &str) -> Result<String, LlmError> {
        let content = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: prompts::SCORE_LEAD,
                    },
                    ChatMessage {
                        role: "user",
                        content: lead_summary,
                    },
                ],
                false,
            )
            .await?;
        Ok(content.trim().to_string())
    }
}

/// Accepts either a bare JSON array of leads or an object with a `leads`
/// array, which is what json_object mode usually produces.
fn parse_extraction(content: &str) -> Result<Vec<LlmLead>, LlmError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| LlmError::MalformedResponse(format!("extraction content is not JSON: {e}")))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("leads") {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) | None => {
                return Err(LlmError::MalformedResponse(
                    "extraction object carries no leads array".to_string(),
                ))
            }
        },
        _ => {
            return Err(LlmError::MalformedResponse(
                "extraction content is neither array nor object".to_string(),
            ))
        }
    };
    // Non-object items are dropped rather than failing the whole call.
    Ok(items
        .into_iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
