use aethercode_project::Language;
use serde::{Deserialize, Serialize};

/// Input for a completion request.
/// 程式碼補全請求的輸入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub file_content: String,
    pub cursor_context: String,
    pub language: Language,
}

/// Completion produced by the model.
/// 模型產生的補全建議。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutput {
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Input for a bug-diagnosis request.
/// 錯誤診斷請求的輸入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub code: String,
    pub language: Language,
}

/// Free-form analysis produced by the model.
/// 模型產生的自由格式分析。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisOutput {
    pub analysis: String,
    pub suggestions: String,
}
