use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::util::current_timestamp;

/// Opaque identifier shared by registry nodes, tabs and assist results.
/// 專案樹節點、分頁與 AI 結果共用的識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Languages understood by the editor and the assist prompts.
/// 編輯器與 AI 提示支援的語言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Html,
    Css,
    Python,
    Json,
    Markdown,
    #[default]
    PlainText,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::TypeScript,
        Language::JavaScript,
        Language::Html,
        Language::Css,
        Language::Python,
        Language::Json,
        Language::Markdown,
        Language::PlainText,
    ];

    /// Name sent to the model; unknown languages travel as `plaintext`.
    /// 傳給模型的語言名稱；未知語言一律為 `plaintext`。
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Html => "html",
            Language::Css => "css",
            Language::Python => "python",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::PlainText => "plaintext",
        }
    }

    /// Parses a language name or common alias, falling back to plain text.
    /// 解析語言名稱或常見別名，無法辨識時回傳純文字。
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "javascript" | "js" | "jsx" => Language::JavaScript,
            "html" | "htm" => Language::Html,
            "css" => Language::Css,
            "python" | "py" => Language::Python,
            "json" => Language::Json,
            "markdown" | "md" => Language::Markdown,
            _ => Language::PlainText,
        }
    }

    /// Starter content for a freshly created file.
    /// 新建檔案的預設內容。
    pub fn template(&self, file_name: &str) -> String {
        match self {
            Language::TypeScript | Language::JavaScript => format!("// {file_name}"),
            Language::Python | Language::Markdown => format!("# {file_name}"),
            Language::Html => format!("<!-- {file_name} -->"),
            Language::Css => format!("/* {file_name} */"),
            Language::Json | Language::PlainText => String::new(),
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Language::from_name(&name))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File-or-folder payload of a node.
/// 節點的檔案或資料夾內容。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileNodeKind {
    File {
        content: String,
        #[serde(default)]
        language: Language,
    },
    Folder {
        #[serde(default)]
        children: Vec<FileNode>,
    },
}

/// Node stored inside the project tree.
/// 專案樹內部的節點。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileNode {
    pub id: FileId,
    pub name: String,
    #[serde(flatten)]
    pub kind: FileNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_unix: Option<i64>,
}

impl FileNode {
    pub fn file(
        id: impl Into<FileId>,
        name: impl Into<String>,
        content: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FileNodeKind::File {
                content: content.into(),
                language,
            },
            last_modified_unix: None,
        }
    }

    pub fn folder(id: impl Into<FileId>, name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FileNodeKind::Folder { children },
            last_modified_unix: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, FileNodeKind::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, FileNodeKind::File { .. })
    }

    /// Saved content for files; `None` for folders.
    /// 檔案的已儲存內容；資料夾回傳 `None`。
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            FileNodeKind::File { content, .. } => Some(content),
            FileNodeKind::Folder { .. } => None,
        }
    }

    pub fn language(&self) -> Option<Language> {
        match &self.kind {
            FileNodeKind::File { language, .. } => Some(*language),
            FileNodeKind::Folder { .. } => None,
        }
    }

    pub fn children(&self) -> &[FileNode] {
        match &self.kind {
            FileNodeKind::Folder { children } => children,
            FileNodeKind::File { .. } => &[],
        }
    }
}

/// Immutable project snapshot; every mutation yields a new revision.
/// 不可變的專案快照；每次變更都會產生新版本。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTree {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub created_at_unix: Option<i64>,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub files: Vec<FileNode>,
    #[serde(default)]
    next_file_seq: u64,
}

impl ProjectTree {
    /// Constructs an empty project.
    /// 建立空白專案。
    pub fn empty(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: None,
            branch: None,
            created_at_unix: Some(current_timestamp()),
            revision: 0,
            files: Vec::new(),
            next_file_seq: 0,
        }
    }

    /// Replaces the top-level nodes, rejecting trees with repeated ids.
    /// 設定頂層節點；若識別碼重複則回傳錯誤。
    pub fn with_files(mut self, files: Vec<FileNode>) -> Result<Self, ProjectTreeError> {
        self.files = files;
        self.validate()?;
        Ok(self)
    }

    /// Checks that no id appears twice.
    /// 檢查識別碼是否唯一。
    pub fn validate(&self) -> Result<(), ProjectTreeError> {
        let mut seen = HashSet::new();
        for node in self.flatten() {
            if !seen.insert(&node.id) {
                return Err(ProjectTreeError::DuplicateId(node.id.clone()));
            }
        }
        Ok(())
    }

    /// Pre-order walk over every node, folders before their children.
    /// 前序走訪所有節點，資料夾先於其子節點。
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            stack: self.files.iter().rev().collect(),
        }
    }

    /// Finds a node by identifier with a direct recursive search.
    /// 以遞迴方式依識別碼尋找節點。
    pub fn find(&self, id: &FileId) -> Option<&FileNode> {
        find_recursive(&self.files, id)
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.find(id).is_some()
    }

    /// Saved content of a file node.
    /// 取得檔案節點的已儲存內容。
    pub fn saved_content(&self, id: &FileId) -> Option<&str> {
        self.find(id).and_then(FileNode::content)
    }

    /// Returns the chain from the top level down to (and including) the node.
    /// 回傳從頂層到該節點（含）的祖先鏈。
    pub fn lineage(&self, id: &FileId) -> Option<Vec<&FileNode>> {
        let mut chain = Vec::new();
        if lineage_recursive(&self.files, id, &mut chain) {
            Some(chain)
        } else {
            None
        }
    }

    /// Slash-separated display path, e.g. `/WebApp/index.html`.
    /// 以斜線分隔的顯示路徑。
    pub fn path_of(&self, id: &FileId) -> Option<String> {
        self.lineage(id).map(|chain| {
            chain.iter().fold(String::new(), |mut path, node| {
                path.push('/');
                path.push_str(&node.name);
                path
            })
        })
    }

    /// Case-insensitive name search that keeps the ancestors of every match.
    /// 不分大小寫的名稱搜尋，保留每個符合項目的祖先節點。
    pub fn filter_by_name(&self, query: &str) -> Vec<FileNode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.files.clone();
        }
        self.files
            .iter()
            .filter_map(|node| prune(node, &needle))
            .collect()
    }

    /// Creates a file under `parent` (or at the top level) with template content.
    /// 在指定資料夾（或頂層）建立帶有範本內容的新檔案。
    pub fn new_file(
        &self,
        parent: Option<&FileId>,
        name: impl Into<String>,
        language: Language,
    ) -> Result<(Self, ProjectTreeDiff), ProjectTreeError> {
        let name = name.into();
        let mut next = self.clone();
        let id = next.mint_id();
        assert!(
            !self.contains(&id),
            "minted file id {id} collides with an existing node"
        );

        let template = language.template(&name);
        let mut node = FileNode::file(id.clone(), name.as_str(), template, language);
        node.last_modified_unix = Some(current_timestamp());

        let mut diff = ProjectTreeDiff::default();
        match parent {
            None => next.files.push(node),
            Some(parent_id) => {
                let parent_node = find_mut(&mut next.files, parent_id)
                    .ok_or_else(|| ProjectTreeError::NodeNotFound(parent_id.clone()))?;
                match &mut parent_node.kind {
                    FileNodeKind::Folder { children } => children.push(node),
                    FileNodeKind::File { .. } => {
                        return Err(ProjectTreeError::InvalidParent(parent_id.clone()))
                    }
                }
                diff.updated.push(parent_id.clone());
            }
        }
        diff.added.push(id.clone());
        next.revision = self.revision.wrapping_add(1);
        debug!(file = %id, revision = next.revision, "created file");
        Ok((next, diff))
    }

    /// Replaces the saved content of a file.
    /// 更新檔案的已儲存內容。
    pub fn save_content(
        &self,
        id: &FileId,
        content: impl Into<String>,
    ) -> Result<(Self, ProjectTreeDiff), ProjectTreeError> {
        let mut next = self.clone();
        let node = find_mut(&mut next.files, id)
            .ok_or_else(|| ProjectTreeError::NodeNotFound(id.clone()))?;
        match &mut node.kind {
            FileNodeKind::File { content: saved, .. } => *saved = content.into(),
            FileNodeKind::Folder { .. } => return Err(ProjectTreeError::NotAFile(id.clone())),
        }
        node.last_modified_unix = Some(current_timestamp());
        next.revision = self.revision.wrapping_add(1);
        Ok((
            next,
            ProjectTreeDiff {
                added: Vec::new(),
                updated: vec![id.clone()],
            },
        ))
    }

    fn mint_id(&mut self) -> FileId {
        loop {
            self.next_file_seq = self.next_file_seq.wrapping_add(1);
            let candidate = FileId::new(format!("file-{}", self.next_file_seq));
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Iterator returned by [`ProjectTree::flatten`].
#[derive(Debug, Clone)]
pub struct Flatten<'a> {
    stack: Vec<&'a FileNode>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

fn find_recursive<'a>(nodes: &'a [FileNode], id: &FileId) -> Option<&'a FileNode> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_recursive(node.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(nodes: &'a mut [FileNode], id: &FileId) -> Option<&'a mut FileNode> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let FileNodeKind::Folder { children } = &mut node.kind {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn lineage_recursive<'a>(
    nodes: &'a [FileNode],
    id: &FileId,
    chain: &mut Vec<&'a FileNode>,
) -> bool {
    for node in nodes {
        chain.push(node);
        if node.id == *id || lineage_recursive(node.children(), id, chain) {
            return true;
        }
        chain.pop();
    }
    false
}

fn prune(node: &FileNode, needle: &str) -> Option<FileNode> {
    if node.name.to_lowercase().contains(needle) {
        return Some(node.clone());
    }
    match &node.kind {
        FileNodeKind::File { .. } => None,
        FileNodeKind::Folder { children } => {
            let kept: Vec<FileNode> = children
                .iter()
                .filter_map(|child| prune(child, needle))
                .collect();
            if kept.is_empty() {
                return None;
            }
            let mut folder = node.clone();
            folder.kind = FileNodeKind::Folder { children: kept };
            Some(folder)
        }
    }
}

/// Captures differences after a tree mutation.
/// 紀錄樹狀結構變動後的差異。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTreeDiff {
    pub added: Vec<FileId>,
    pub updated: Vec<FileId>,
}

/// Tree-manipulation errors.
/// 專案樹操作錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectTreeError {
    #[error("node {0} not found")]
    NodeNotFound(FileId),
    #[error("node {0} cannot accept children")]
    InvalidParent(FileId),
    #[error("node {0} is a folder and has no content")]
    NotAFile(FileId),
    #[error("node id {0} appears more than once")]
    DuplicateId(FileId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectTree {
        ProjectTree::empty("p", "Sample")
            .with_files(vec![
                FileNode::file("1", "README.md", "# readme", Language::Markdown),
                FileNode::folder(
                    "2",
                    "WebApp",
                    vec![
                        FileNode::file("3", "index.html", "<html/>", Language::Html),
                        FileNode::folder(
                            "4",
                            "assets",
                            vec![FileNode::file("5", "style.css", "body{}", Language::Css)],
                        ),
                    ],
                ),
                FileNode::folder("6", "empty", Vec::new()),
            ])
            .unwrap()
    }

    #[test]
    fn flatten_is_pre_order_and_complete() {
        let tree = sample();
        let ids: Vec<&str> = tree.flatten().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);

        // restartable
        assert_eq!(tree.flatten().count(), 6);
        let unique: HashSet<_> = tree.flatten().map(|node| &node.id).collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn folders_precede_their_descendants() {
        fn descendants(node: &FileNode, out: &mut Vec<FileId>) {
            for child in node.children() {
                out.push(child.id.clone());
                descendants(child, out);
            }
        }

        let tree = sample();
        let order: Vec<&FileId> = tree.flatten().map(|node| &node.id).collect();
        for (position, node) in tree.flatten().enumerate() {
            let mut below = Vec::new();
            descendants(node, &mut below);
            for id in below {
                let index = order.iter().position(|candidate| **candidate == id).unwrap();
                assert!(index > position, "{id} listed before its folder {}", node.id);
            }
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ProjectTree::empty("p", "dup")
            .with_files(vec![
                FileNode::file("1", "a", "", Language::PlainText),
                FileNode::folder("2", "f", vec![FileNode::file("1", "b", "", Language::PlainText)]),
            ])
            .unwrap_err();
        assert_eq!(err, ProjectTreeError::DuplicateId(FileId::from("1")));
    }

    #[test]
    fn lineage_and_paths_follow_ancestors() {
        let tree = sample();
        assert_eq!(
            tree.path_of(&FileId::from("5")).as_deref(),
            Some("/WebApp/assets/style.css")
        );
        let names: Vec<&str> = tree
            .lineage(&FileId::from("3"))
            .unwrap()
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["WebApp", "index.html"]);
        assert!(tree.lineage(&FileId::from("missing")).is_none());
    }

    #[test]
    fn filter_keeps_ancestors_of_matches() {
        let tree = sample();
        let filtered = tree.filter_by_name("STYLE");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "WebApp");
        assert_eq!(filtered[0].children().len(), 1);
        assert_eq!(filtered[0].children()[0].children()[0].name, "style.css");
        assert!(tree.filter_by_name("nothing-here").is_empty());
        assert_eq!(tree.filter_by_name("  ").len(), 3);
    }

    #[test]
    fn new_file_creates_new_revision_under_folder() {
        let tree = sample();
        let parent = FileId::from("2");
        let (next, diff) = tree.new_file(Some(&parent), "app.ts", Language::TypeScript).unwrap();

        assert_eq!(next.revision, tree.revision + 1);
        assert_eq!(diff.updated, vec![parent.clone()]);
        let id = diff.added[0].clone();
        let created = next.find(&id).unwrap();
        assert_eq!(created.content(), Some("// app.ts"));
        assert_eq!(next.path_of(&id).as_deref(), Some("/WebApp/app.ts"));
        assert!(!tree.contains(&id), "original snapshot is untouched");
    }

    #[test]
    fn new_file_at_root_mints_unique_ids() {
        let tree = ProjectTree::empty("p", "p")
            .with_files(vec![FileNode::file("file-1", "taken", "", Language::PlainText)])
            .unwrap();
        let (tree, first) = tree.new_file(None, "a.py", Language::Python).unwrap();
        let (tree, second) = tree.new_file(None, "b.py", Language::Python).unwrap();
        assert_ne!(first.added[0], FileId::from("file-1"));
        assert_ne!(first.added[0], second.added[0]);
        assert_eq!(tree.files.len(), 3);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn new_file_errors_on_bad_parent() {
        let tree = sample();
        let err = tree
            .new_file(Some(&FileId::from("3")), "x", Language::PlainText)
            .unwrap_err();
        assert_eq!(err, ProjectTreeError::InvalidParent(FileId::from("3")));
        let err = tree
            .new_file(Some(&FileId::from("nope")), "x", Language::PlainText)
            .unwrap_err();
        assert_eq!(err, ProjectTreeError::NodeNotFound(FileId::from("nope")));
    }

    #[test]
    fn save_content_only_touches_files() {
        let tree = sample();
        let id = FileId::from("5");
        let (next, diff) = tree.save_content(&id, "body{color:red}").unwrap();
        assert_eq!(next.saved_content(&id), Some("body{color:red}"));
        assert_eq!(tree.saved_content(&id), Some("body{}"));
        assert_eq!(diff.updated, vec![id]);
        assert_eq!(
            tree.save_content(&FileId::from("4"), "x").unwrap_err(),
            ProjectTreeError::NotAFile(FileId::from("4"))
        );
    }

    #[test]
    fn nodes_serialize_with_type_tag() {
        let node = FileNode::file("3", "index.html", "<p/>", Language::Html);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["language"], "html");
        let back: FileNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);

        let unknown: FileNode = serde_json::from_str(
            r#"{"id":"9","name":"x.rb","type":"file","content":"","language":"ruby"}"#,
        )
        .unwrap();
        assert_eq!(unknown.language(), Some(Language::PlainText));
    }

    #[test]
    fn language_aliases_and_templates() {
        assert_eq!(Language::from_name("PY"), Language::Python);
        assert_eq!(Language::from_name("cobol"), Language::PlainText);
        assert_eq!(Language::Html.template("a.html"), "<!-- a.html -->");
        assert_eq!(Language::Json.template("a.json"), "");
    }
}
