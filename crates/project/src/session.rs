use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::tree::{FileId, ProjectTree};

/// One transition of the tab session.
/// 分頁工作階段的一次狀態轉換。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TabAction {
    Open {
        file_id: FileId,
        initial_content: String,
    },
    Edit {
        file_id: FileId,
        content: String,
    },
    Close {
        file_id: FileId,
    },
    SetActive {
        #[serde(default)]
        file_id: Option<FileId>,
    },
}

/// Open tabs, the active tab and the unsaved draft of every open file.
/// 已開啟分頁、使用中分頁以及每個檔案的未儲存草稿。
///
/// `active` is `None` exactly when no tab is open, and every open id owns one
/// draft. Operations on ids that are not open leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSession {
    open_order: Vec<FileId>,
    active: Option<FileId>,
    drafts: BTreeMap<FileId, String>,
}

impl TabSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an action; returns `true` when the state changed.
    /// 套用動作；若狀態改變則回傳 `true`。
    pub fn apply(&mut self, action: TabAction) -> bool {
        match action {
            TabAction::Open {
                file_id,
                initial_content,
            } => self.open(file_id, initial_content),
            TabAction::Edit { file_id, content } => self.edit(&file_id, content),
            TabAction::Close { file_id } => self.close(&file_id),
            TabAction::SetActive { file_id } => self.set_active(file_id.as_ref()),
        }
    }

    /// Opens a tab, or focuses it when it is already open.
    /// 開啟分頁；若已開啟則僅切換焦點。
    pub fn open(&mut self, file_id: FileId, initial_content: impl Into<String>) -> bool {
        if self.is_open(&file_id) {
            let changed = self.active.as_ref() != Some(&file_id);
            self.active = Some(file_id);
            return changed;
        }
        debug!(file = %file_id, "opening tab");
        self.drafts.insert(file_id.clone(), initial_content.into());
        self.open_order.push(file_id.clone());
        self.active = Some(file_id);
        true
    }

    /// Records a new draft for an open file.
    /// 為已開啟的檔案記錄新草稿。
    pub fn edit(&mut self, file_id: &FileId, content: impl Into<String>) -> bool {
        match self.drafts.get_mut(file_id) {
            Some(draft) => {
                *draft = content.into();
                true
            }
            None => {
                trace!(file = %file_id, "ignoring edit for closed tab");
                false
            }
        }
    }

    /// Closes a tab; the left neighbour takes focus if the closed tab was active.
    /// 關閉分頁；若關閉的是使用中分頁則由左側分頁取得焦點。
    pub fn close(&mut self, file_id: &FileId) -> bool {
        let Some(index) = self.position(file_id) else {
            trace!(file = %file_id, "ignoring close for unknown tab");
            return false;
        };
        self.open_order.remove(index);
        self.drafts.remove(file_id);

        if self.active.as_ref() == Some(file_id) {
            self.active = if self.open_order.is_empty() {
                None
            } else {
                let next = index.saturating_sub(1);
                Some(self.open_order[next].clone())
            };
        }
        debug!(file = %file_id, active = ?self.active, "closed tab");
        true
    }

    /// Focuses an open tab. `None` is accepted only when nothing is open.
    /// 切換至已開啟的分頁；僅在沒有分頁時接受 `None`。
    pub fn set_active(&mut self, file_id: Option<&FileId>) -> bool {
        match file_id {
            Some(id) if self.is_open(id) => {
                let changed = self.active.as_ref() != Some(id);
                self.active = Some(id.clone());
                changed
            }
            None if self.open_order.is_empty() => false,
            _ => {
                trace!(file = ?file_id, "rejecting activation outside the open set");
                false
            }
        }
    }

    /// Draft for an open file, otherwise the saved content from the registry.
    /// 已開啟檔案回傳草稿，否則回傳專案樹中的已儲存內容。
    pub fn current_draft<'a>(
        &'a self,
        file_id: &FileId,
        registry: &'a ProjectTree,
    ) -> Option<&'a str> {
        self.draft(file_id).or_else(|| registry.saved_content(file_id))
    }

    /// Draft for an open file.
    pub fn draft(&self, file_id: &FileId) -> Option<&str> {
        self.drafts.get(file_id).map(String::as_str)
    }

    /// Whether the draft differs from the registry's saved content.
    /// 草稿是否與已儲存內容不同。
    pub fn is_dirty(&self, file_id: &FileId, registry: &ProjectTree) -> bool {
        match self.draft(file_id) {
            Some(draft) => registry.saved_content(file_id) != Some(draft),
            None => false,
        }
    }

    pub fn is_open(&self, file_id: &FileId) -> bool {
        self.drafts.contains_key(file_id)
    }

    pub fn active(&self) -> Option<&FileId> {
        self.active.as_ref()
    }

    pub fn open_order(&self) -> &[FileId] {
        &self.open_order
    }

    pub fn len(&self) -> usize {
        self.open_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_order.is_empty()
    }

    fn position(&self, file_id: &FileId) -> Option<usize> {
        self.open_order.iter().position(|id| id == file_id)
    }
}
