//! Testimony draft generation
//!
//! Thin client for the Anthropic Messages API. Disabled unless an API
//! key is configured; drafts are returned to the user for review and
//! are never stored directly.

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::AppError;
use crate::metrics::GENERATION_REQUESTS_TOTAL;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_DRAFT_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "You help people write personal faith testimonies. \
Write a warm, first-person testimony from the story points the user provides. \
Keep it honest and grounded in what they shared; do not invent events. \
Return only the testimony text.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// Client for the testimony generation API
pub struct TestimonyGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl TestimonyGenerator {
    /// Build a generator from configuration.
    ///
    /// Returns None when no API key is configured.
    pub fn from_config(config: &GenerationConfig) -> Result<Option<Self>, AppError> {
        if !config.enabled() {
            return Ok(None);
        }

        let client = reqwest::Client::builder()
            .user_agent("Lightning/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Some(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .unwrap_or_default()
                .trim()
                .to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }))
    }

    /// Draft a testimony from the user's story points.
    ///
    /// # Arguments
    /// * `story` - Free-form story points from the user
    /// * `tone` - Optional tone hint (e.g. "reflective", "joyful")
    pub async fn generate(&self, story: &str, tone: Option<&str>) -> Result<String, AppError> {
        let mut prompt = format!("Story points:\n{}", story);
        if let Some(tone) = tone.map(str::trim).filter(|tone| !tone.is_empty()) {
            prompt.push_str(&format!("\n\nDesired tone: {}", tone));
        }

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_DRAFT_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                GENERATION_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                AppError::HttpClient(error)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            GENERATION_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            tracing::warn!(%status, body = %body, "Generation API returned an error");
            return Err(AppError::Generation(format!(
                "generation API returned {}",
                status
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|error| {
            GENERATION_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            AppError::HttpClient(error)
        })?;

        let draft: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if draft.trim().is_empty() {
            GENERATION_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            return Err(AppError::Generation(
                "generation API returned no text".to_string(),
            ));
        }

        GENERATION_REQUESTS_TOTAL
            .with_label_values(&["success"])
            .inc();
        Ok(draft.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_is_none_without_key() {
        let generator = TestimonyGenerator::from_config(&GenerationConfig::default()).unwrap();
        assert!(generator.is_none());
    }

    #[test]
    fn from_config_builds_with_key() {
        let config = GenerationConfig {
            api_key: Some("sk-test".to_string()),
            model: "claude-3-5-haiku-latest".to_string(),
            base_url: "https://api.anthropic.com/".to_string(),
        };
        let generator = TestimonyGenerator::from_config(&config).unwrap().unwrap();
        assert_eq!(generator.base_url, "https://api.anthropic.com");
    }
}
