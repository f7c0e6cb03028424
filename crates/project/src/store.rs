use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::demo;
use crate::tree::{FileId, ProjectTree, ProjectTreeError};
use crate::util::write_atomic;

/// Durable backing for the project tree.
/// 專案樹的持久化後端。
pub trait ProjectStore {
    /// Loads the current project snapshot.
    fn load_project(&self) -> Result<ProjectTree, ProjectStoreError>;

    /// Persists a whole snapshot (used after structural changes).
    fn save_project(&mut self, tree: &ProjectTree) -> Result<(), ProjectStoreError>;

    /// Replaces the saved content of one file and returns the new snapshot.
    /// 更新單一檔案的已儲存內容並回傳新快照。
    fn save_file(&mut self, id: &FileId, content: &str) -> Result<ProjectTree, ProjectStoreError> {
        let (tree, _) = self.load_project()?.save_content(id, content)?;
        self.save_project(&tree)?;
        Ok(tree)
    }
}

/// Keeps the project in memory; seeded with the demo project by default.
/// 將專案保存在記憶體中；預設載入示範專案。
#[derive(Debug, Clone)]
pub struct MemoryProjectStore {
    tree: ProjectTree,
}

impl MemoryProjectStore {
    pub fn new(tree: ProjectTree) -> Self {
        Self { tree }
    }
}

impl Default for MemoryProjectStore {
    fn default() -> Self {
        Self::new(demo::project())
    }
}

impl ProjectStore for MemoryProjectStore {
    fn load_project(&self) -> Result<ProjectTree, ProjectStoreError> {
        Ok(self.tree.clone())
    }

    fn save_project(&mut self, tree: &ProjectTree) -> Result<(), ProjectStoreError> {
        self.tree = tree.clone();
        Ok(())
    }
}

/// Persists `ProjectTree` snapshots to disk using JSON + atomic writes.
/// 以 JSON 搭配原子寫入方式儲存 `ProjectTree` 快照。
#[derive(Debug)]
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    /// Constructs a store bound to the provided path.
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads a project from disk, returning `Ok(None)` when the file is absent.
    /// 從磁碟載入專案；若檔案不存在則回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<ProjectTree>, ProjectStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let tree: ProjectTree = serde_json::from_str(&contents)
                    .map_err(|err| ProjectStoreError::Invalid(err.to_string()))?;
                tree.validate()?;
                Ok(Some(tree))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ProjectStoreError::Io(err)),
        }
    }

    /// Saves the provided project atomically to disk.
    /// 將傳入的專案以原子方式寫入磁碟。
    pub fn save(&self, tree: &ProjectTree) -> Result<(), ProjectStoreError> {
        let payload = serde_json::to_vec_pretty(tree)
            .map_err(|err| ProjectStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload)?;
        debug!(path = %self.path.display(), revision = tree.revision, "saved project");
        Ok(())
    }
}

impl ProjectStore for JsonProjectStore {
    fn load_project(&self) -> Result<ProjectTree, ProjectStoreError> {
        match self.load()? {
            Some(tree) => Ok(tree),
            None => {
                info!(path = %self.path.display(), "no saved project, using demo project");
                Ok(demo::project())
            }
        }
    }

    fn save_project(&mut self, tree: &ProjectTree) -> Result<(), ProjectStoreError> {
        self.save(tree)
    }
}

/// Errors emitted by [`ProjectStore`] implementations.
/// [`ProjectStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum ProjectStoreError {
    #[error("project IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid project payload: {0}")]
    Invalid(String),
    #[error(transparent)]
    Tree(#[from] ProjectTreeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Language;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonProjectStore::new(dir.path().join("project.json"));

        let tree = demo::project();
        let (tree, diff) = tree
            .new_file(Some(&FileId::from("6")), "math.py", Language::Python)
            .unwrap();
        store.save(&tree).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, tree);
        assert_eq!(
            loaded.saved_content(&diff.added[0]),
            Some("# math.py")
        );
    }

    #[test]
    fn load_missing_returns_none_and_project_falls_back_to_demo() {
        let dir = tempdir().unwrap();
        let store = JsonProjectStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.load_project().unwrap().id, "proj_1");
    }

    #[test]
    fn corrupt_payload_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonProjectStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ProjectStoreError::Invalid(_)));
    }

    #[test]
    fn save_file_persists_content() {
        let dir = tempdir().unwrap();
        let mut store = JsonProjectStore::new(dir.path().join("project.json"));
        let id = FileId::from("5");
        let tree = store.save_file(&id, "console.log('hi')").unwrap();
        assert_eq!(tree.saved_content(&id), Some("console.log('hi')"));
        let reloaded = store.load().unwrap().unwrap();
        assert_eq!(reloaded.saved_content(&id), Some("console.log('hi')"));
        assert_eq!(reloaded.revision, 1);
    }

    #[test]
    fn memory_store_rejects_folders() {
        let mut store = MemoryProjectStore::default();
        let err = store.save_file(&FileId::from("2"), "x").unwrap_err();
        assert!(matches!(
            err,
            ProjectStoreError::Tree(ProjectTreeError::NotAFile(_))
        ));
    }
}
