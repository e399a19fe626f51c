use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Positional identity of a task node: the document path plus the 0-indexed
/// line the task sits on. Only valid until the document is next written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(path: &str, line_index: usize) -> Self {
        NodeId(format!("{}:{}", path, line_index))
    }

    /// Placeholder root for tasks that appear before any depth-1 task.
    pub fn placeholder_root(path: &str) -> Self {
        NodeId(format!("{}:root", path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One parsed task line plus its derived hierarchy metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: NodeId,
    pub document_path: String,
    /// 0-indexed line in the document
    pub line_index: usize,
    /// The task line exactly as it appears in the document
    pub raw_line: String,
    /// 1-based indentation level
    pub depth: usize,
    pub checked: bool,
    /// Payload text after the checkbox
    pub text: String,
    /// Nearest preceding depth-1 node (or the document's placeholder root)
    pub root_group_id: NodeId,
    /// Lower-cased, trimmed text of the root task; display use only
    pub root_token: String,
    pub parent_id: Option<NodeId>,
}

/// Parent id → child ids, in document line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildrenIndex {
    children: IndexMap<NodeId, Vec<NodeId>>,
}

impl ChildrenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: NodeId, child: NodeId) {
        self.children.entry(parent).or_default().push(child);
    }

    pub fn children_of(&self, parent: &NodeId) -> &[NodeId] {
        self.children.get(parent).map_or(&[], |c| c.as_slice())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Fold another index into this one. Ids embed their document path, so
    /// indexes from different documents never collide.
    pub fn merge(&mut self, other: &ChildrenIndex) {
        for (parent, kids) in &other.children {
            self.children
                .entry(parent.clone())
                .or_default()
                .extend(kids.iter().cloned());
        }
    }

    /// Pre-order walk starting from `roots`.
    pub fn walk_depth_first<'a>(&'a self, roots: impl IntoIterator<Item = &'a NodeId>) -> Vec<&'a NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = roots.into_iter().collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children_of(id).iter().rev());
        }
        out
    }
}

/// Scanner output for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub path: String,
    pub nodes: Vec<TaskNode>,
    pub children: ChildrenIndex,
}

impl ParsedDocument {
    /// Nodes without a parent, in line order
    pub fn roots(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(|n| n.parent_id.is_none())
    }

    pub fn node_at(&self, line_index: usize) -> Option<&TaskNode> {
        self.nodes
            .binary_search_by_key(&line_index, |n| n.line_index)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn find(&self, id: &NodeId) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}
