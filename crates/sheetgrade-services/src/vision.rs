//! AI vision sheet reader using a Gemini-style generateContent API.
//!
//! Sends the sheet photo inline with a prompt that asks for a bare JSON
//! object of question-number to letter mappings, then parses whatever JSON
//! the model wrapped its answer in.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sheetgrade_core::model::StudentAnswers;

use crate::error::ServiceError;
use crate::reader::{MarkReadout, ReadOptions, SheetReader};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";
const DEFAULT_TIMEOUT_SECS: u64 = 120; // Vision calls on large photos are slow

/// Client for a Gemini-style vision model.
pub struct VisionClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl VisionClient {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        }
    }

    /// Use a different model than the default.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn prompt_for(options: &ReadOptions) -> String {
        let letters = options
            .choices
            .letters()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Analyze this photo of a completed exam answer sheet with {n} questions. \
             Each question offers the choices {letters}, and the student marks an \
             answer with an X or by filling the bubble. Identify the marked answer \
             for every question. Respond with ONLY a JSON object mapping question \
             numbers to letters, like {{\"1\": \"B\", \"2\": \"C\"}}. Use null for \
             questions with no visible mark.",
            n = options.num_questions,
        )
    }
}

/// Pick an image MIME type from the uploaded filename.
fn mime_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<VisionContent>,
}

#[derive(Serialize)]
struct VisionContent {
    parts: Vec<VisionPart>,
}

#[derive(Serialize)]
struct VisionPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct VisionError {
    error: VisionErrorBody,
}

#[derive(Deserialize)]
struct VisionErrorBody {
    message: String,
}

#[async_trait]
impl SheetReader for VisionClient {
    fn name(&self) -> &str {
        "vision"
    }

    #[instrument(skip(self, image, options), fields(model = %self.model, questions = options.num_questions))]
    async fn read_marks(
        &self,
        image: &[u8],
        filename: &str,
        options: &ReadOptions,
    ) -> anyhow::Result<MarkReadout> {
        let body = GenerateContentRequest {
            contents: vec![VisionContent {
                parts: vec![
                    VisionPart {
                        text: Some(Self::prompt_for(options)),
                        inline_data: None,
                    },
                    VisionPart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_for(filename).to_string(),
                            data: BASE64.encode(image),
                        }),
                    },
                ],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self.client.post(url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ServiceError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ServiceError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(ServiceError::ModelNotFound(self.model.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<VisionError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            // Gemini reports a bad key as a plain 400.
            if status == 400 && message.contains("API key not valid") {
                return Err(ServiceError::AuthenticationFailed(message).into());
            }
            return Err(ServiceError::ApiError { status, message }.into());
        }

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            ServiceError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        let text = api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        let answers = StudentAnswers::from_json_text(&text, options.num_questions)
            .map_err(ServiceError::MalformedResponse)?;

        Ok(MarkReadout {
            answers,
            confidence: 0.0, // The model reports no mark-level confidence.
            flags: Vec::new(),
            debug: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgrade_core::model::{Choice, ChoiceSet};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn choice(c: char) -> Choice {
        Choice::from_char(c).unwrap()
    }

    fn client_for(server: &MockServer) -> VisionClient {
        VisionClient::new("test-key", Some(server.uri()))
    }

    fn options() -> ReadOptions {
        ReadOptions::new(3, ChoiceSet::default())
    }

    #[tokio::test]
    async fn successful_read_with_chatty_response() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "Here you go:\n{\"1\": \"b\", \"2\": null, \"3\": \"C\"}\nLet me know!"}]
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let readout = client.read_marks(b"photo", "sheet.png", &options()).await.unwrap();

        assert_eq!(readout.answers.get(1), Some(choice('B')));
        assert_eq!(readout.answers.get(2), None);
        assert_eq!(readout.answers.get(3), Some(choice('C')));
        assert!(readout.flags.is_empty());

        // The request inlines the photo as base64 with the png MIME type.
        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("image/png"));
        assert!(body.contains(&BASE64.encode(b"photo")));
        assert!(body.contains("3 questions"));
    }

    #[tokio::test]
    async fn response_without_json_is_malformed() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "I cannot read this image."}]}
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read_marks(b"photo", "sheet.jpg", &options())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServiceError>(),
            Some(ServiceError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn invalid_key_maps_to_authentication_failed() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}
        });

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&response_body))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read_marks(b"photo", "sheet.jpg", &options())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServiceError>(),
            Some(ServiceError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_model_maps_to_model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/imaginary:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = client_for(&server).with_model("imaginary");
        let err = client
            .read_marks(b"photo", "sheet.jpg", &options())
            .await
            .unwrap_err();
        match err.downcast_ref::<ServiceError>() {
            Some(ServiceError::ModelNotFound(model)) => assert_eq!(model, "imaginary"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read_marks(b"photo", "sheet.jpg", &options())
            .await
            .unwrap_err();
        match err.downcast_ref::<ServiceError>() {
            Some(ServiceError::RateLimited { retry_after_ms }) => {
                assert_eq!(*retry_after_ms, 12_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_for("scan.PNG"), "image/png");
        assert_eq!(mime_for("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for("sheet.webp"), "image/webp");
        assert_eq!(mime_for("no-extension"), "image/jpeg");
    }
}
