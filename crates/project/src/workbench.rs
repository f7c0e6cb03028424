use thiserror::Error;
use tracing::{debug, info, warn};

use crate::index::FileIndex;
use crate::session::{TabAction, TabSession};
use crate::store::{ProjectStore, ProjectStoreError};
use crate::tree::{FileId, FileNode, Language, ProjectTree, ProjectTreeError};

/// Project snapshot, its id index, the tab session and the backing store.
/// 專案快照、識別碼索引、分頁工作階段與持久化後端的組合。
pub struct Workbench {
    tree: ProjectTree,
    index: FileIndex,
    session: TabSession,
    store: Box<dyn ProjectStore>,
}

impl Workbench {
    /// Loads the project from `store` with no tabs open.
    /// 從儲存後端載入專案，初始時不開啟任何分頁。
    pub fn load(store: Box<dyn ProjectStore>) -> Result<Self, WorkbenchError> {
        let tree = store.load_project()?;
        info!(project = %tree.id, revision = tree.revision, "loaded project");
        Ok(Self {
            index: FileIndex::build(&tree),
            tree,
            session: TabSession::new(),
            store,
        })
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn session(&self) -> &TabSession {
        &self.session
    }

    pub fn find(&self, id: &FileId) -> Option<&FileNode> {
        self.index.get(&self.tree, id)
    }

    /// Opens or focuses a file picked in the explorer; folders and unknown ids are ignored.
    /// 開啟或切換至檔案總管中選取的檔案；資料夾與未知識別碼會被忽略。
    pub fn select(&mut self, id: &FileId) -> bool {
        let Some(content) = self.find(id).and_then(FileNode::content) else {
            return false;
        };
        let content = content.to_string();
        self.session.open(id.clone(), content)
    }

    /// Applies a session action; `open` is only honoured for files present in the tree.
    /// 套用分頁動作；僅對專案樹中存在的檔案執行開啟。
    pub fn apply(&mut self, action: TabAction) -> bool {
        if let TabAction::Open { file_id, .. } = &action {
            if !self.find(file_id).is_some_and(FileNode::is_file) {
                warn!(file = %file_id, "ignoring open for unknown file");
                return false;
            }
        }
        self.session.apply(action)
    }

    pub fn edit(&mut self, id: &FileId, content: impl Into<String>) -> bool {
        self.session.edit(id, content)
    }

    pub fn close(&mut self, id: &FileId) -> bool {
        self.session.close(id)
    }

    pub fn set_active(&mut self, id: Option<&FileId>) -> bool {
        self.session.set_active(id)
    }

    /// Replaces the draft with an assist suggestion.
    /// 以 AI 建議內容取代草稿。
    pub fn apply_suggestion(&mut self, id: &FileId, snippet: impl Into<String>) -> bool {
        let applied = self.session.edit(id, snippet);
        if applied {
            debug!(file = %id, "applied suggestion");
        }
        applied
    }

    pub fn active_file(&self) -> Option<&FileNode> {
        self.session.active().and_then(|id| self.find(id))
    }

    /// Draft if open, otherwise saved content.
    /// 已開啟則回傳草稿，否則回傳已儲存內容。
    pub fn current_draft(&self, id: &FileId) -> Option<&str> {
        self.session
            .draft(id)
            .or_else(|| self.find(id).and_then(FileNode::content))
    }

    pub fn is_dirty(&self, id: &FileId) -> bool {
        match self.session.draft(id) {
            Some(draft) => self.find(id).and_then(FileNode::content) != Some(draft),
            None => false,
        }
    }

    /// Creates a file, persists the project and opens the new file.
    /// 建立檔案、儲存專案並開啟新檔案。
    pub fn new_file(
        &mut self,
        parent: Option<&FileId>,
        name: &str,
        language: Language,
    ) -> Result<FileId, WorkbenchError> {
        let (tree, diff) = self.tree.new_file(parent, name, language)?;
        let id = diff.added[0].clone();
        self.store.save_project(&tree)?;
        self.replace_tree(tree);
        self.select(&id);
        Ok(id)
    }

    /// Writes the current draft through the store; the tab stays open and becomes clean.
    /// 透過儲存後端寫入目前草稿；分頁維持開啟並標記為已儲存。
    pub fn save(&mut self, id: &FileId) -> Result<(), WorkbenchError> {
        let node = self
            .find(id)
            .ok_or_else(|| ProjectTreeError::NodeNotFound(id.clone()))?;
        if node.is_folder() {
            return Err(ProjectTreeError::NotAFile(id.clone()).into());
        }
        let content = self.current_draft(id).unwrap_or_default().to_string();
        let tree = self.store.save_file(id, &content)?;
        info!(file = %id, revision = tree.revision, "saved file");
        self.replace_tree(tree);
        Ok(())
    }

    fn replace_tree(&mut self, tree: ProjectTree) {
        self.index = FileIndex::build(&tree);
        self.tree = tree;
    }
}

/// Errors raised by [`Workbench`] operations that touch the registry or store.
/// [`Workbench`] 操作專案樹或儲存後端時的錯誤。
#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error(transparent)]
    Tree(#[from] ProjectTreeError),
    #[error(transparent)]
    Store(#[from] ProjectStoreError),
}
