use std::collections::HashMap;

use crate::tree::{FileId, FileNode, ProjectTree};

/// Id lookup table derived once per tree revision.
/// 每個專案樹版本建立一次的識別碼索引。
///
/// Each entry stores the child positions leading to the node, so a lookup is
/// one hash probe plus a walk bounded by the tree depth.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    revision: u64,
    slots: HashMap<FileId, Vec<usize>>,
}

impl FileIndex {
    pub fn build(tree: &ProjectTree) -> Self {
        let mut slots = HashMap::new();
        let mut trail = Vec::new();
        record(&tree.files, &mut trail, &mut slots);
        Self {
            revision: tree.revision,
            slots,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.slots.contains_key(id)
    }

    /// Resolves `id` inside `tree`; the tree must be the one the index was built from.
    /// 在建立索引所用的專案樹中解析節點。
    pub fn get<'t>(&self, tree: &'t ProjectTree, id: &FileId) -> Option<&'t FileNode> {
        let trail = self.slots.get(id)?;
        let (first, rest) = trail.split_first()?;
        let mut node = tree.files.get(*first)?;
        for position in rest {
            node = node.children().get(*position)?;
        }
        (node.id == *id).then_some(node)
    }
}

fn record(nodes: &[FileNode], trail: &mut Vec<usize>, slots: &mut HashMap<FileId, Vec<usize>>) {
    for (position, node) in nodes.iter().enumerate() {
        trail.push(position);
        slots.insert(node.id.clone(), trail.clone());
        record(node.children(), trail, slots);
        trail.pop();
    }
}
