//! AI assist boundary: completion and diagnosis requests behind a uniform envelope.
//! AI 輔助邊界：以統一格式回傳補全與診斷結果。

mod backend;
mod envelope;
mod error;
pub mod feed;
pub mod gemini;
mod prompt;
mod service;
mod types;

pub use backend::ModelBackend;
pub use envelope::{ActionResult, Routed};
pub use error::AssistError;
pub use feed::{AssistFeed, Diagnosis, Suggestion, SuggestionKind};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use service::{AssistService, DEFAULT_TIMEOUT, DIAGNOSTICS_FAILED, SUGGESTION_FAILED};
pub use tokio_util::sync::CancellationToken;
pub use types::{CompletionOutput, CompletionRequest, DiagnosisOutput, DiagnosisRequest};
