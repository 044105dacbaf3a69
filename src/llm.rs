//! ==============================================================================
//! llm.rs - outbound text generation
//! ==============================================================================
//!
//! purpose:
//!     the only network client in the app. forwards one chat message, together
//!     with the assistant persona, to a generative-language endpoint and pulls
//!     the reply text out of the response.
//!
//! relationships:
//!     - used by: chat.rs (through the TextGenerator trait)
//!     - configured by: config.rs (ChatConfig)
//!
//! credentials:
//!     the api key is read from the environment on every call. nothing is
//!     cached and nothing is checked at startup; a missing key is just an
//!     error for that one call.
//!
//! ==============================================================================

use crate::config::ChatConfig;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// anything that can turn a prompt into reply text
pub trait TextGenerator: Send + Sync + 'static {
    fn generate(&self, persona: &str, text: &str) -> impl Future<Output = Result<String>> + Send;
}

// ==============================================================================
// wire format
// ==============================================================================

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(persona: &'a str, text: &'a str) -> Self {
        Self {
            system_instruction: Content { role: None, parts: vec![RequestPart { text: persona }] },
            contents: vec![Content { role: Some("user"), parts: vec![RequestPart { text }] }],
        }
    }
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// text of the first candidate, parts joined; empty when there is none
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// ==============================================================================
// client
// ==============================================================================

#[derive(Clone, Debug)]
pub struct GenerativeClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key_env: String,
}

impl GenerativeClient {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

impl TextGenerator for GenerativeClient {
    async fn generate(&self, persona: &str, text: &str) -> Result<String> {
        let key = std::env::var(&self.api_key_env)
            .with_context(|| format!("{} is not set", self.api_key_env))?;

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", key.as_str())])
            .json(&GenerateRequest::new(persona, text))
            .send()
            .await
            .context("generate request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("generate api returned {}: {}", status, detail);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("failed to decode generate response")?;

        Ok(parsed.text())
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key_env: &str) -> GenerativeClient {
        GenerativeClient::new(&ChatConfig {
            base_url: "https://example.invalid/".to_string(),
            model: "test-model".to_string(),
            api_key_env: api_key_env.to_string(),
            persona: String::new(),
        })
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            client("X").endpoint(),
            "https://example.invalid/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn request_carries_persona_and_text() {
        let body = serde_json::to_value(GenerateRequest::new("be nice", "why are my bees loud?")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "system_instruction": { "parts": [{ "text": "be nice" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "why are my bees loud?" }] }]
            })
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    { "content": { "role": "model", "parts": [{ "text": "Queen " }, { "text": "piping." }] } },
                    { "content": { "parts": [{ "text": "ignored" }] } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "Queen piping.");
    }

    #[test]
    fn response_without_text_is_empty() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{ "candidates": [{ "finishReason": "SAFETY" }] }"#).unwrap();
        assert_eq!(blocked.text(), "");

        let nothing: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(nothing.text(), "");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let err = client("HIVE_MONITOR_TEST_KEY_THAT_IS_NEVER_SET")
            .generate("persona", "hello")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("HIVE_MONITOR_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
