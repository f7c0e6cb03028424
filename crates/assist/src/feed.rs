use aethercode_project::FileId;
use serde::{Deserialize, Serialize};

use crate::envelope::Routed;
use crate::types::{CompletionOutput, DiagnosisOutput};

pub const DEFAULT_EXPLANATION: &str = "AI-generated suggestion";

/// Where a suggestion came from.
/// 建議的來源種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Suggestion,
    Diagnostic,
}

/// A panel entry (completion or diagnosis fix), tagged with the requesting file.
/// 供介面顯示的補全建議，附帶請求時的檔案識別碼。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub file_id: FileId,
    pub snippet: String,
    pub explanation: String,
    pub kind: SuggestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: String,
    pub file_id: FileId,
    pub analysis: String,
    pub suggestions: String,
}

/// Assist results accumulated for the panel.
/// 累積給 AI 面板顯示的結果。
///
/// Suggestions are kept newest first. Only the latest diagnosis is retained;
/// starting a new diagnosis clears the previous one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssistFeed {
    suggestions: Vec<Suggestion>,
    diagnosis: Option<Diagnosis>,
    #[serde(skip)]
    next_seq: u64,
}

impl AssistFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completion for `file_id` and returns the stored entry.
    /// 記錄一筆補全建議並回傳儲存後的項目。
    pub fn record_suggestion(&mut self, file_id: FileId, output: CompletionOutput) -> &Suggestion {
        let id = format!("sug-{}", self.bump());
        let explanation = output
            .explanation
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string());
        self.suggestions.insert(
            0,
            Suggestion {
                id,
                file_id,
                snippet: output.suggestion,
                explanation,
                kind: SuggestionKind::Suggestion,
            },
        );
        &self.suggestions[0]
    }

    /// Records a routed completion if it succeeded; failures leave the feed untouched.
    /// 若路由結果成功則記錄；失敗時不變更內容。
    pub fn record_routed_suggestion(&mut self, routed: Routed<CompletionOutput>) -> bool {
        match routed.result.into_result() {
            Ok(output) => {
                self.record_suggestion(routed.file_id, output);
                true
            }
            Err(_) => false,
        }
    }

    /// Clears the previous diagnosis before a new request is issued.
    /// 發出新的診斷請求前清除先前的結果。
    pub fn begin_diagnosis(&mut self) {
        self.diagnosis = None;
    }

    /// Stores the diagnosis and lists its fix suggestions in the panel as a
    /// diagnostic entry.
    /// 儲存診斷結果，並將修正建議以診斷項目加入建議清單。
    pub fn record_diagnosis(&mut self, file_id: FileId, output: DiagnosisOutput) -> &Diagnosis {
        let id = format!("diag-{}", self.bump());
        let entry = Suggestion {
            id: format!("sug-{}", self.bump()),
            file_id: file_id.clone(),
            snippet: output.suggestions.clone(),
            explanation: output.analysis.clone(),
            kind: SuggestionKind::Diagnostic,
        };
        self.suggestions.insert(0, entry);
        self.diagnosis.insert(Diagnosis {
            id,
            file_id,
            analysis: output.analysis,
            suggestions: output.suggestions,
        })
    }

    /// Records a routed diagnosis if it succeeded; failures leave the feed untouched.
    /// 若路由診斷成功則記錄；失敗時不變更內容。
    pub fn record_routed_diagnosis(&mut self, routed: Routed<DiagnosisOutput>) -> bool {
        match routed.result.into_result() {
            Ok(output) => {
                self.record_diagnosis(routed.file_id, output);
                true
            }
            Err(_) => false,
        }
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn suggestions_for<'a>(
        &'a self,
        file_id: &'a FileId,
    ) -> impl Iterator<Item = &'a Suggestion> + 'a {
        self.suggestions
            .iter()
            .filter(move |suggestion| suggestion.file_id == *file_id)
    }

    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref()
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
