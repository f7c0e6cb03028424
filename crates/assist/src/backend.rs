use async_trait::async_trait;

use crate::error::AssistError;
use crate::types::{CompletionOutput, CompletionRequest, DiagnosisOutput, DiagnosisRequest};

/// The external text-generation service, reached through two fixed calls.
/// 外部文字生成服務，只透過兩個固定呼叫存取。
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn suggest_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutput, AssistError>;

    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<DiagnosisOutput, AssistError>;
}
