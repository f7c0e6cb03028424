//! Project registry and tab-session primitives for AetherCode.
//! 管理 AetherCode 專案樹、分頁工作階段與儲存的核心模組。

mod util;

pub mod demo;
pub mod index;
pub mod session;
pub mod store;
pub mod tree;
pub mod workbench;

pub use index::FileIndex;
pub use session::{TabAction, TabSession};
pub use store::{JsonProjectStore, MemoryProjectStore, ProjectStore, ProjectStoreError};
pub use tree::{
    FileId, FileNode, FileNodeKind, Flatten, Language, ProjectTree, ProjectTreeDiff,
    ProjectTreeError,
};
pub use workbench::{Workbench, WorkbenchError};
