use std::time::Duration;

use thiserror::Error;

/// Failures inside the assist boundary. Never surfaced past [`crate::AssistService`].
/// AI 邊界內部的錯誤；不會越過 [`crate::AssistService`]。
#[derive(Debug, Error)]
pub enum AssistError {
    /// Transport failure, wrapped with its URL stripped.
    #[error("request failed: {0}")]
    Http(reqwest::Error),
    #[error("model API error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
    #[error("request task aborted: {0}")]
    Aborted(String),
}
