use aethercode_project::FileId;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Uniform result handed to the UI: `{success:true,data}` or `{success:false,error}`.
/// 交給介面的統一結果格式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult<T> {
    Success(T),
    Failure(String),
}

impl<T> ActionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ActionResult::Success(data) => Some(data),
            ActionResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure(message) => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ActionResult::Success(data) => Ok(data),
            ActionResult::Failure(message) => Err(message),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ActionResult", 2)?;
        match self {
            ActionResult::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ActionResult::Failure(error) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// A response labelled with the file id captured when the request was issued.
/// 以發出請求時擷取的檔案識別碼標記的回應。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Routed<T> {
    pub file_id: FileId,
    pub result: ActionResult<T>,
}
