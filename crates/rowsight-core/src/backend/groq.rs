//! Groq extraction backend (OpenAI-compatible chat completions).
//!
//! Sends the page as a data-URL image part with `json_object` response
//! format; decoding is shared with the other adapters.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    classify_request_error, extraction_prompt, outcome_from_payload, BackendOutcome,
    FailureReason, TableBackend,
};
use crate::raster::PageImage;
use crate::schema::TableSchema;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub const GROQ_BACKEND_NAME: &str = "groq";

/// Explicit configuration for one Groq backend instance.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
    /// Full chat-completions URL; overridable for tests.
    pub api_url: String,
    pub timeout: Duration,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_url: GROQ_API_URL.to_string(),
            timeout,
        }
    }
}

/// Groq-backed [`TableBackend`].
pub struct GroqBackend {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqBackend {
    pub fn new(config: GroqConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TableBackend for GroqBackend {
    async fn extract(&self, image: &PageImage, schema: &TableSchema) -> BackendOutcome {
        let data_url = format!(
            "data:image/png;base64,{}",
            BASE64_STANDARD.encode(&image.png_data)
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                    ContentPart::Text {
                        text: extraction_prompt(schema),
                    },
                ],
            }],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
            temperature: 0.0,
        };

        let response = match self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return BackendOutcome::Failure(classify_request_error(&err)),
        };

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<GroqErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => "unreadable error body".to_string(),
            };
            warn!(
                doc = %image.document_name,
                page = image.page_index,
                status = status.as_u16(),
                %message,
                "groq returned an error status"
            );
            return BackendOutcome::Failure(FailureReason::BadStatus(status.as_u16()));
        }

        let body: ChatResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => return BackendOutcome::Failure(classify_request_error(&err)),
        };

        let Some(text) = body.first_content() else {
            return BackendOutcome::Failure(FailureReason::Malformed(
                "response contained no message content".to_string(),
            ));
        };

        debug!(
            doc = %image.document_name,
            page = image.page_index,
            bytes = text.len(),
            "groq answered"
        );

        outcome_from_payload(schema, &text)
    }

    fn name(&self) -> &'static str {
        GROQ_BACKEND_NAME
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatResponse {
    fn first_content(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqErrorBody {
    error: GroqErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GroqErrorDetail {
    message: String,
}
