use std::sync::Arc;

use serde::Serialize;

use super::node::{ChildrenIndex, ParsedDocument, TaskNode};

/// One document's tasks within a group
#[derive(Debug, Clone)]
pub struct FileBucket {
    pub path: String,
    pub display_name: String,
    /// Shared with every other bucket that references the same document
    pub document: Arc<ParsedDocument>,
}

impl FileBucket {
    pub fn items(&self) -> &[TaskNode] {
        &self.document.nodes
    }
}

#[derive(Debug, Clone)]
pub struct GroupBucket {
    pub key: String,
    pub name: String,
    pub files: Vec<FileBucket>,
}

impl GroupBucket {
    pub fn task_count(&self) -> usize {
        self.files.iter().map(|f| f.items().len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    /// No rule names a group: one pseudo-group holding every matched document
    Flat,
    Grouped,
}

/// Result of one grouping pass
#[derive(Debug, Clone)]
pub struct Grouping {
    pub mode: GroupingMode,
    pub groups: Vec<GroupBucket>,
    /// Children of every included document, keyed by globally unique node id
    pub children: ChildrenIndex,
}

impl Grouping {
    /// Distinct documents across all groups
    pub fn document_count(&self) -> usize {
        let mut paths: Vec<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.files.iter().map(|f| f.path.as_str()))
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths.len()
    }
}
