//! OMR (optical mark recognition) microservice client.
//!
//! Speaks the bubble-sheet reading service's HTTP API: a multipart upload of
//! the sheet image plus a JSON options blob, answered with a per-question
//! letter mapping.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sheetgrade_core::model::{Choice, StudentAnswers};

use crate::error::ServiceError;
use crate::reader::{MarkReadout, ReadOptions, SheetReader};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the OMR sheet-reading microservice.
pub struct OmrClient {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OmrClient {
    pub fn new(base_url: &str) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Replace the request timeout (default 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self.client = build_client(self.timeout_secs);
        self
    }

    /// Probe the service's health endpoint. Any failure reads as unavailable.
    pub async fn health(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build HTTP client")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OmrOptionsBody {
    num_questions: usize,
    choices: Vec<String>,
    template: String,
    debug: bool,
}

#[derive(Deserialize)]
struct OmrReadResponse {
    answers: HashMap<String, Option<String>>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    debug: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct OmrErrorResponse {
    detail: String,
}

/// Convert the wire answer map into a positional sequence. Keys that are not
/// question numbers, out-of-range numbers and non-letter values are dropped.
fn sequence_from_wire(
    answers: &HashMap<String, Option<String>>,
    num_questions: usize,
) -> StudentAnswers {
    let pairs = answers.iter().filter_map(|(key, value)| {
        let number = key.trim().parse::<u32>().ok()?;
        let choice = value.as_deref()?.trim().parse::<Choice>().ok()?;
        Some((number, choice))
    });
    StudentAnswers::from_pairs(pairs, num_questions)
}

#[async_trait]
impl SheetReader for OmrClient {
    fn name(&self) -> &str {
        "omr"
    }

    #[instrument(skip(self, image, options), fields(filename = %filename, questions = options.num_questions))]
    async fn read_marks(
        &self,
        image: &[u8],
        filename: &str,
        options: &ReadOptions,
    ) -> anyhow::Result<MarkReadout> {
        let options_body = OmrOptionsBody {
            num_questions: options.num_questions,
            choices: options
                .choices
                .letters()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            template: "AUTO".to_string(),
            debug: options.debug,
        };

        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(image.to_vec())
                    .file_name(filename.to_string()),
            )
            .text("options", serde_json::to_string(&options_body)?);

        let response = self
            .client
            .post(format!("{}/api/omr/read", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ServiceError::Unavailable(format!(
                        "OMR service not reachable at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    ServiceError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OmrErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(ServiceError::ApiError { status, message }.into());
        }

        let api_response: OmrReadResponse = response.json().await.map_err(|e| {
            ServiceError::MalformedResponse(format!("failed to parse OMR response: {e}"))
        })?;

        Ok(MarkReadout {
            answers: sequence_from_wire(&api_response.answers, options.num_questions),
            confidence: api_response.confidence,
            flags: api_response.flags,
            debug: api_response.debug,
        })
    }
}
