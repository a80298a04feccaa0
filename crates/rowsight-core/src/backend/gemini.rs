//! Google Gemini extraction backend.
//!
//! Calls the `generateContent` REST endpoint with an inline base64 PNG and
//! JSON response mode, then strictly decodes the answer against the schema.

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

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const GEMINI_BACKEND_NAME: &str = "gemini";

/// Explicit configuration for one Gemini backend instance.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL up to (not including) the model segment; overridable for tests.
    pub api_base: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base: GEMINI_API_BASE.to_string(),
            timeout,
        }
    }
}

/// Gemini-backed [`TableBackend`].
pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.api_base, self.config.model
        )
    }
}

#[async_trait]
impl TableBackend for GeminiBackend {
    async fn extract(&self, image: &PageImage, schema: &TableSchema) -> BackendOutcome {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: BASE64_STANDARD.encode(&image.png_data),
                        },
                    },
                    Part::Text {
                        text: extraction_prompt(schema),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.0,
            },
        };

        let response = match self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.config.api_key)
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
            let message = match response.json::<GeminiErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => "unreadable error body".to_string(),
            };
            warn!(
                doc = %image.document_name,
                page = image.page_index,
                status = status.as_u16(),
                %message,
                "gemini returned an error status"
            );
            return BackendOutcome::Failure(FailureReason::BadStatus(status.as_u16()));
        }

        let body: GenerateContentResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => return BackendOutcome::Failure(classify_request_error(&err)),
        };

        let Some(text) = body.first_text() else {
            return BackendOutcome::Failure(FailureReason::Malformed(
                "response contained no text candidate".to_string(),
            ));
        };

        debug!(
            doc = %image.document_name,
            page = image.page_index,
            bytes = text.len(),
            "gemini answered"
        );

        outcome_from_payload(schema, &text)
    }

    fn name(&self) -> &'static str {
        GEMINI_BACKEND_NAME
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|part| part.text.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
