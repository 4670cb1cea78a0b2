//! OpenAI-compatible chat completions backend.

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::Generator;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub struct OpenAiGenerator {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiGenerator {
    /// Reads the key from `OPENAI_API_KEY`; `OPENAI_BASE_URL` overrides the
    /// configured base URL.
    pub fn from_config(config: &GeneratorConfig, timeout_ms: u64) -> Result<Self, GenerationError> {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        let api_base = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| config.api_base.clone());
        Self::new(config, api_key, api_base, timeout_ms)
    }

    pub fn new(
        config: &GeneratorConfig,
        api_key: Option<String>,
        api_base: String,
        timeout_ms: u64,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .user_agent(concat!("vazhi/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_headers(&self) -> Result<HeaderMap, GenerationError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            GenerationError::MissingCredentials(format!("set {} to enable generation", API_KEY_ENV))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| GenerationError::MissingCredentials(e.to_string()))?,
        );
        Ok(headers)
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        if let Some(mt) = self.max_tokens {
            body["max_tokens"] = json!(mt);
        }
        body
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let headers = self.build_headers()?;
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling generator");

        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let value: Value = resp.json().await?;
        parse_completion(&value)
    }
}

/// Pull `choices[0].message.content` out of a chat completion.
pub fn parse_completion(value: &Value) -> Result<String, GenerationError> {
    let content = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .ok_or_else(|| GenerationError::Parse("completion has no message content".into()))?;

    let text = content.as_str().unwrap_or_default().trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let value = json!({
            "choices": [{"message": {"role": "assistant", "content": "  academic\n"}}]
        });
        assert_eq!(parse_completion(&value).unwrap(), "academic");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(
            parse_completion(&json!({"choices": []})),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_completion(&json!({"choices": [{"message": {"content": ""}}]})),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_request_body() {
        let config = GeneratorConfig {
            max_tokens: Some(256),
            ..GeneratorConfig::default()
        };
        let generator =
            OpenAiGenerator::new(&config, Some("k".into()), "http://localhost:1/v1/".into(), 1_000)
                .unwrap();
        let body = generator.request_body("hi");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(generator.api_base, "http://localhost:1/v1");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let generator = OpenAiGenerator::new(
            &GeneratorConfig::default(),
            None,
            "http://localhost:1/v1".into(),
            1_000,
        )
        .unwrap();
        let err = generator.generate("hi").await.unwrap_err();
        assert_eq!(err.code_str(), "auth_failed");
    }
}
