use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aethercode_project::FileId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::backend::ModelBackend;
use crate::envelope::{ActionResult, Routed};
use crate::error::AssistError;
use crate::types::{CompletionOutput, CompletionRequest, DiagnosisOutput, DiagnosisRequest};

pub const SUGGESTION_FAILED: &str = "Failed to get AI suggestion.";
pub const DIAGNOSTICS_FAILED: &str = "Failed to run AI diagnostics.";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point used by the UI layer. Every failure comes back as
/// [`ActionResult::Failure`]; nothing here returns `Err` or panics outward.
///
/// Each call runs on its own task so a misbehaving backend cannot take the
/// caller down, and is bounded by the configured timeout and the caller's
/// cancellation token.
#[derive(Clone)]
pub struct AssistService {
    backend: Arc<dyn ModelBackend>,
    timeout: Duration,
}

impl AssistService {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get_code_suggestion(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ActionResult<CompletionOutput> {
        let backend = Arc::clone(&self.backend);
        let outcome = self
            .guarded(cancel, async move { backend.suggest_completion(&request).await })
            .await;
        settle("code suggestion", SUGGESTION_FAILED, outcome)
    }

    pub async fn get_code_diagnostics(
        &self,
        request: DiagnosisRequest,
        cancel: &CancellationToken,
    ) -> ActionResult<DiagnosisOutput> {
        let backend = Arc::clone(&self.backend);
        let outcome = self
            .guarded(cancel, async move { backend.diagnose(&request).await })
            .await;
        settle("code diagnostics", DIAGNOSTICS_FAILED, outcome)
    }

    /// Suggestion labelled with the file it was requested for.
    /// 以請求當下的檔案識別碼標記補全結果。
    pub async fn suggest_for(
        &self,
        file_id: FileId,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Routed<CompletionOutput> {
        let result = self.get_code_suggestion(request, cancel).await;
        Routed { file_id, result }
    }

    /// Diagnosis labelled with the file it was requested for.
    /// 以請求當下的檔案識別碼標記診斷結果。
    pub async fn diagnose_for(
        &self,
        file_id: FileId,
        request: DiagnosisRequest,
        cancel: &CancellationToken,
    ) -> Routed<DiagnosisOutput> {
        let result = self.get_code_diagnostics(request, cancel).await;
        Routed { file_id, result }
    }

    async fn guarded<T, F>(&self, cancel: &CancellationToken, call: F) -> Result<T, AssistError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, AssistError>> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(AssistError::Cancelled);
        }
        let mut task = tokio::spawn(call);
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(AssistError::Cancelled),
            _ = tokio::time::sleep(self.timeout) => Err(AssistError::Timeout(self.timeout)),
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(join_error) => Err(AssistError::Aborted(join_error.to_string())),
            },
        };
        if outcome.is_err() {
            task.abort();
        }
        outcome
    }
}

fn settle<T>(operation: &str, failure: &str, outcome: Result<T, AssistError>) -> ActionResult<T> {
    match outcome {
        Ok(data) => {
            debug!(operation, "assist request succeeded");
            ActionResult::Success(data)
        }
        Err(err) => {
            error!(operation, error = %err, "assist request failed");
            ActionResult::Failure(failure.to_string())
        }
    }
}
