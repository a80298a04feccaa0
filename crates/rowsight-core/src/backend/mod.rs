//! Structured-extraction backend abstraction.
//!
//! This module provides a unified interface over remote vision backends:
//! - Google Gemini (primary)
//! - Groq (fallback)
//!
//! A backend receives one page image plus the target schema and must always
//! answer with a [`BackendOutcome`] - transport problems, bad statuses,
//! timeouts and malformed payloads are all folded into
//! [`BackendOutcome::Failure`] so the page processor can branch on data
//! rather than on errors.

pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use serde_json::Value;

use crate::raster::PageImage;
use crate::schema::{Row, TableSchema};

/// Why a backend attempt failed. Drives logging and the fallback decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network-level failure reaching the service.
    Transport(String),
    /// The externally imposed request timeout elapsed.
    Timeout,
    /// The service answered with a non-success HTTP status.
    BadStatus(u16),
    /// The response was not valid structured data for the schema.
    Malformed(String),
    /// The backend was configured without a credential.
    MissingCredential,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {}", message),
            Self::Timeout => write!(f, "request timed out"),
            Self::BadStatus(status) => write!(f, "unexpected HTTP status {}", status),
            Self::Malformed(message) => write!(f, "malformed response: {}", message),
            Self::MissingCredential => write!(f, "no credential configured"),
        }
    }
}

/// Result of one (page, backend) attempt.
#[derive(Debug, Clone)]
pub enum BackendOutcome {
    /// The backend answered with decodable rows; may be empty for a page
    /// that genuinely contains no table.
    Success(Vec<Row>),
    Failure(FailureReason),
}

/// A structured-extraction service invoked with one page image.
///
/// `extract` never panics and never returns an error type: every failure
/// mode is a [`BackendOutcome::Failure`].
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn extract(&self, image: &PageImage, schema: &TableSchema) -> BackendOutcome;

    /// Stable identifier used in logs and page results.
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn TableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stand-in for a backend whose credential is absent at startup.
///
/// Keeps the configured backend order observable (and the fallback path
/// exercised) instead of crashing the process.
pub struct UnconfiguredBackend {
    name: &'static str,
}

impl UnconfiguredBackend {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl TableBackend for UnconfiguredBackend {
    async fn extract(&self, _image: &PageImage, _schema: &TableSchema) -> BackendOutcome {
        BackendOutcome::Failure(FailureReason::MissingCredential)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Shared prompt sent to every backend, derived from the schema.
pub(crate) fn extraction_prompt(schema: &TableSchema) -> String {
    format!(
        "Analyze this image. Extract any tabular data found into a structured JSON object. \
         The JSON must contain a key named '{table_key}' which is an array of objects \
         representing the rows. Use only these column names as keys: {columns}. \
         Use null for cells that are empty or unreadable. \
         If the page contains no table, return an empty '{table_key}' array.",
        table_key = crate::schema::TABLE_KEY,
        columns = schema.columns().join(", "),
    )
}

/// Map a reqwest error to a failure reason, separating timeouts from other
/// transport problems.
pub(crate) fn classify_request_error(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        FailureReason::Timeout
    } else {
        FailureReason::Transport(err.to_string())
    }
}

/// Strictly decode the text a backend produced into an outcome.
///
/// The text must be a JSON document matching the `table_data` contract;
/// anything else is `Malformed`.
pub(crate) fn outcome_from_payload(schema: &TableSchema, text: &str) -> BackendOutcome {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            return BackendOutcome::Failure(FailureReason::Malformed(format!(
                "response is not valid JSON: {}",
                err
            )))
        }
    };

    match schema.decode_rows(&value) {
        Ok(rows) => BackendOutcome::Success(rows),
        Err(err) => BackendOutcome::Failure(FailureReason::Malformed(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new(["Customer Name", "Invoice Number"]).unwrap()
    }

    #[test]
    fn payload_decode_success_and_empty() {
        let outcome = outcome_from_payload(
            &schema(),
            r#"{"table_data": [{"Customer Name": "Acme"}]}"#,
        );
        assert!(matches!(outcome, BackendOutcome::Success(rows) if rows.len() == 1));

        let outcome = outcome_from_payload(&schema(), r#"{"table_data": []}"#);
        assert!(matches!(outcome, BackendOutcome::Success(rows) if rows.is_empty()));
    }

    #[test]
    fn garbage_payload_is_malformed_not_a_panic() {
        for text in ["not json at all", "[1, 2, 3]", r#"{"wrong_key": []}"#] {
            let outcome = outcome_from_payload(&schema(), text);
            assert!(
                matches!(outcome, BackendOutcome::Failure(FailureReason::Malformed(_))),
                "expected malformed for {:?}",
                text
            );
        }
    }

    #[test]
    fn prompt_names_every_schema_column() {
        let prompt = extraction_prompt(&schema());
        assert!(prompt.contains("Customer Name"));
        assert!(prompt.contains("Invoice Number"));
        assert!(prompt.contains(crate::schema::TABLE_KEY));
    }

    #[tokio::test]
    async fn unconfigured_backend_always_fails_with_missing_credential() {
        let backend = UnconfiguredBackend::new("gemini");
        let image = PageImage {
            document_name: "a.pdf".to_string(),
            page_index: 0,
            width: 1,
            height: 1,
            png_data: vec![0],
        };
        let outcome = backend.extract(&image, &schema()).await;
        assert!(matches!(
            outcome,
            BackendOutcome::Failure(FailureReason::MissingCredential)
        ));
    }
}
