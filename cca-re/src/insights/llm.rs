//! OpenAI-compatible chat completions client

use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::{InsightError, InsightGenerator};
use crate::reports::ComprehensiveReport;
use async_trait::async_trait;
use cca_common::config::LlmConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("cca-re/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
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
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct LlmInsightGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmInsightGenerator {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, InsightError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| InsightError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Extract the JSON object from a chat completion body
///
/// Models sometimes wrap JSON in a Markdown fence; the fence is stripped.
fn parse_completion(body: ChatResponse) -> Result<Value, InsightError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| InsightError::InvalidResponse("no content in completion".to_string()))?;

    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(unfenced)
        .map_err(|e| InsightError::InvalidResponse(format!("content is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(InsightError::InvalidResponse(
            "content is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

#[async_trait]
impl InsightGenerator for LlmInsightGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, report: &ComprehensiveReport) -> Result<Value, InsightError> {
        let prompt = build_prompt(report);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            user_id = %report.user.id,
            model = %self.model,
            sections = report.sections.len(),
            "Requesting AI insights"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| InsightError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| InsightError::InvalidResponse(e.to_string()))?;
        let insights = parse_completion(body)?;

        info!(user_id = %report.user.id, model = %self.model, "AI insights generated");
        Ok(insights)
    }
}
