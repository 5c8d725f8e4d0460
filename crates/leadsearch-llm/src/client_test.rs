use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadsearch_core::LlmSettings;

use super::*;
use crate::capability::LlmCapability;

fn settings(base_url: &str) -> LlmSettings {
    LlmSettings {
        base_url: Some(base_url.to_string()),
        api_key: Some("sk-test".to_string()),
        ..LlmSettings::default()
    }
}

fn client(base_url: &str) -> OpenAiCompatClient {
    OpenAiCompatClient::new(settings(base_url), Duration::from_secs(5)).unwrap()
}

fn chat_reply(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
    }))
}

#[tokio::test]
async fn extract_leads_parses_leads_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(chat_reply(json!({
            "leads": [
                {"company_name": "Acme Plumbing", "phone": "+1 612 555 0101", "confidence": 0.8},
                {"company_name": "Duluth Drains", "email": "info@duluthdrains.com"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let leads = client(&server.uri())
        .extract_leads("google_maps", "Acme Plumbing - +1 612 555 0101")
        .await
        .unwrap();

    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].company_name.as_deref(), Some("Acme Plumbing"));
    assert_eq!(leads[0].confidence, Some(0.8));
    assert_eq!(leads[1].email.as_deref(), Some("info@duluthdrains.com"));
}

#[tokio::test]
async fn extract_leads_accepts_bare_array_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply(json!([
            {"company_name": "Solo LLC"},
            "not-an-object"
        ])))
        .mount(&server)
        .await;

    let leads = client(&server.uri())
        .extract_leads("yelp", "text")
        .await
        .unwrap();

    // Non-object items are dropped, not fatal.
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].company_name.as_deref(), Some("Solo LLC"));
}

#[tokio::test]
async fn provider_error_surfaces_status_and_body_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error": {"message": "Incorrect API key provided"}}"#),
        )
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .extract_leads("google_maps", "text")
        .await
        .unwrap_err();

    match err {
        LlmError::Provider { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key provided"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_extraction_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "sorry, I cannot help"}}]
        })))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .extract_leads("google_maps", "text")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn empty_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server.uri()).rationale("summary").await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn rationale_returns_trimmed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Strong lead: has email and phone.\n"}}]
        })))
        .mount(&server)
        .await;

    let rationale = client(&server.uri())
        .rationale("Acme Plumbing, hvac, Minneapolis")
        .await
        .unwrap();
    assert_eq!(rationale, "Strong lead: has email and phone.");
}

#[test]
fn endpoint_trims_trailing_slash() {
    let client = client("http://localhost:9999/");
    assert_eq!(
        client.endpoint(),
        "http://localhost:9999/v1/chat/completions"
    );
}
