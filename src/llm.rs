//! Hosted chat-completion client.
//!
//! Speaks the OpenAI-compatible `POST {base_url}/chat/completions` protocol
//! (OpenRouter by default). The prompt is sent as a single user message.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use pdf_rag_core::{RagError, Result};

use crate::config::CompletionConfig;

/// A text-generation backend.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a reply of at most `max_tokens` tokens.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

pub struct ChatCompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::upstream(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::upstream(format!(
                "completion API error {}: {}",
                status, text
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RagError::upstream(format!("completion response read failed: {}", e)))?;
        parse_completion(&text)
    }
}

fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| RagError::response_format("completion has no choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> ChatCompletionClient {
        ChatCompletionClient::new(&CompletionConfig {
            base_url: format!("{}/api/v1/", uri),
            api_key: "sk-test".to_string(),
            ..CompletionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_completion_shapes() {
        let ok = r#"{"choices":[{"message":{"role":"assistant","content":"Alpha."}}]}"#;
        assert_eq!(parse_completion(ok).unwrap(), "Alpha.");

        for bad in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            r#"{"error":"nope"}"#,
        ] {
            assert!(matches!(
                parse_completion(bad),
                Err(RagError::ResponseFormat(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_token_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek/deepseek-chat:free",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 600
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server.uri()).complete("hi", 600).await.unwrap();
        assert_eq!(answer, "hello");
    }

    #[tokio::test]
    async fn test_complete_error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).complete("hi", 512).await.unwrap_err();
        assert!(matches!(err, RagError::Upstream(_)));
    }
}
