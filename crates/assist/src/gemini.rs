//! Generative Language API backend.
//!
//! Sends the prompt to `models/{model}:generateContent` with a JSON response
//! schema, then decodes the first candidate's text as the structured output.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::ModelBackend;
use crate::error::AssistError;
use crate::prompt::{completion_prompt, diagnosis_prompt};
use crate::types::{CompletionOutput, CompletionRequest, DiagnosisOutput, DiagnosisRequest};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable named in the error when `api_key` is missing.
    pub api_key_env: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: Value,
    ) -> Result<T, AssistError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AssistError::MissingApiKey(self.config.api_key_env.clone()))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        debug!(model = %self.config.model, "sending generateContent request");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| AssistError::Http(err.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(AssistError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| AssistError::MalformedResponse(err.without_url().to_string()))?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| {
                AssistError::MalformedResponse("response has no candidate text".into())
            })?;

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|err| AssistError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn suggest_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutput, AssistError> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "suggestion": { "type": "STRING", "description": "The AI-powered code completion suggestion." },
                "explanation": { "type": "STRING", "description": "An optional explanation of the suggestion." }
            },
            "required": ["suggestion"]
        });
        self.generate(completion_prompt(request), schema).await
    }

    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<DiagnosisOutput, AssistError> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "analysis": { "type": "STRING", "description": "The analysis of the code, including potential bugs and security issues." },
                "suggestions": { "type": "STRING", "description": "Suggestions for fixing the identified issues and improving the code." }
            },
            "required": ["analysis", "suggestions"]
        });
        self.generate(diagnosis_prompt(request), schema).await
    }
}

// Some models wrap JSON output in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aethercode_project::Language;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, api_key: Option<&str>) -> GeminiBackend {
        GeminiBackend::new(GeminiConfig {
            endpoint: server.uri(),
            model: "test-model".into(),
            api_key: api_key.map(str::to_string),
            api_key_env: "TEST_KEY".into(),
        })
    }

    fn candidate(text: &str) -> Value {
        json!({ "candidates": [ { "content": { "parts": [ { "text": text } ] } } ] })
    }

    #[tokio::test]
    async fn diagnose_decodes_structured_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                r#"{"analysis":"looks fine","suggestions":"add type hints"}"#,
            )))
            .mount(&server)
            .await;

        let output = backend(&server, Some("secret"))
            .diagnose(&DiagnosisRequest {
                code: "def f(): pass".into(),
                language: Language::Python,
            })
            .await
            .unwrap();
        assert_eq!(output.analysis, "looks fine");
        assert_eq!(output.suggestions, "add type hints");
    }

    #[tokio::test]
    async fn completion_accepts_fenced_json_without_explanation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate("```json\n{\"suggestion\":\"x + 1\"}\n```")),
            )
            .mount(&server)
            .await;

        let output = backend(&server, Some("k"))
            .suggest_completion(&CompletionRequest {
                file_content: "let x = 1;".into(),
                cursor_context: "x".into(),
                language: Language::TypeScript,
            })
            .await
            .unwrap();
        assert_eq!(output.suggestion, "x + 1");
        assert_eq!(output.explanation, None);
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key invalid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = backend(&server, Some("bad"))
            .diagnose(&DiagnosisRequest {
                code: String::new(),
                language: Language::PlainText,
            })
            .await
            .unwrap_err();
        match err {
            AssistError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_candidates_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = backend(&server, Some("k"))
            .diagnose(&DiagnosisRequest {
                code: String::new(),
                language: Language::Css,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let server = MockServer::start().await;
        let err = backend(&server, None)
            .diagnose(&DiagnosisRequest {
                code: String::new(),
                language: Language::Css,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::MissingApiKey(ref env) if env == "TEST_KEY"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_key_stays_out_of_the_url_and_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                r#"{"analysis":"a","suggestions":"s"}"#,
            )))
            .mount(&server)
            .await;
        backend(&server, Some("SUPER-SECRET-KEY"))
            .diagnose(&DiagnosisRequest {
                code: String::new(),
                language: Language::Css,
            })
            .await
            .unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);

        let unreachable = GeminiBackend::new(GeminiConfig {
            endpoint: "http://127.0.0.1:1".into(),
            model: "m".into(),
            api_key: Some("SUPER-SECRET-KEY".into()),
            api_key_env: "TEST_KEY".into(),
        });
        let err = unreachable
            .diagnose(&DiagnosisRequest {
                code: String::new(),
                language: Language::Css,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Http(_)));
        let text = format!("{err} {err:?}");
        assert!(!text.contains("SUPER-SECRET-KEY"), "key leaked: {text}");
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
