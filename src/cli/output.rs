use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::bucket::{FileBucket, GroupBucket, Grouping, GroupingMode};
use crate::model::document::DocumentChange;
use crate::model::node::{NodeId, ParsedDocument, TaskNode};
use crate::ops::relocate::{Deletion, Relocation};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct GroupingJson {
    pub mode: GroupingMode,
    pub groups: Vec<GroupJson>,
}

#[derive(Serialize)]
pub struct GroupJson {
    pub key: String,
    pub name: String,
    pub tasks: usize,
    pub files: Vec<FileJson>,
}

#[derive(Serialize)]
pub struct FileJson {
    pub path: String,
    pub display_name: String,
    pub tasks: usize,
}

#[derive(Serialize)]
pub struct TreeJson {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    pub tasks: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct NodeJson {
    pub id: String,
    /// 1-based, as accepted by locators
    pub line: usize,
    pub depth: usize,
    pub checked: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct RelocationJson {
    pub source: String,
    pub destination: String,
    pub lines: usize,
    /// 1-based line of the moved task in the destination
    pub line: usize,
    pub depth: usize,
}

#[derive(Serialize)]
pub struct DeletionJson {
    pub path: String,
    pub line: usize,
    pub lines: Vec<String>,
}

#[derive(Serialize)]
pub struct LineJson {
    pub path: String,
    pub line: usize,
    pub raw: String,
}

#[derive(Serialize)]
pub struct ChangeJson<'a> {
    #[serde(flatten)]
    pub change: &'a DocumentChange,
    pub suppressed: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn grouping_to_json(grouping: &Grouping) -> GroupingJson {
    GroupingJson {
        mode: grouping.mode,
        groups: grouping.groups.iter().map(group_to_json).collect(),
    }
}

fn group_to_json(group: &GroupBucket) -> GroupJson {
    GroupJson {
        key: group.key.clone(),
        name: group.name.clone(),
        tasks: group.task_count(),
        files: group.files.iter().map(file_to_json).collect(),
    }
}

fn file_to_json(file: &FileBucket) -> FileJson {
    FileJson {
        path: file.path.clone(),
        display_name: file.display_name.clone(),
        tasks: file.items().len(),
    }
}

/// Nested JSON form of a document's task forest
pub fn tree_to_json(document: &ParsedDocument, modified: Option<u64>) -> TreeJson {
    TreeJson {
        path: document.path.clone(),
        modified: modified.and_then(format_modified),
        tasks: document
            .roots()
            .map(|root| node_to_json(document, root))
            .collect(),
    }
}

fn node_to_json(document: &ParsedDocument, node: &TaskNode) -> NodeJson {
    NodeJson {
        id: node.id.to_string(),
        line: node.line_index + 1,
        depth: node.depth,
        checked: node.checked,
        text: node.text.clone(),
        children: document
            .children
            .children_of(&node.id)
            .iter()
            .filter_map(|id| document.find(id))
            .map(|child| node_to_json(document, child))
            .collect(),
    }
}

pub fn relocation_to_json(relocation: &Relocation) -> RelocationJson {
    RelocationJson {
        source: relocation.source_path.clone(),
        destination: relocation.destination_path.clone(),
        lines: relocation.line_count(),
        line: relocation.inserted_at + 1,
        depth: relocation.new_depth,
    }
}

pub fn deletion_to_json(deletion: &Deletion) -> DeletionJson {
    DeletionJson {
        path: deletion.path.clone(),
        line: deletion.removed.start + 1,
        lines: deletion.lines.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Millisecond timestamp as RFC 3339 (UTC)
pub fn format_modified(millis: u64) -> Option<String> {
    let millis = i64::try_from(millis).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|t| t.to_rfc3339())
}

/// Group headers followed by their files, one per line
pub fn format_grouping(grouping: &Grouping) -> Vec<String> {
    let mut lines = Vec::new();
    for group in &grouping.groups {
        lines.push(format!(
            "{} ({} files, {} tasks)",
            group.name,
            group.files.len(),
            group.task_count()
        ));
        for file in &group.files {
            lines.push(format!(
                "  {}  {}  [{}]",
                file.display_name,
                file.path,
                file.items().len()
            ));
        }
    }
    lines
}

/// One task per line in depth-first order: line number, indent, checkbox, text
pub fn format_tree(document: &ParsedDocument) -> Vec<String> {
    let roots: Vec<&NodeId> = document.roots().map(|n| &n.id).collect();
    document
        .children
        .walk_depth_first(roots)
        .into_iter()
        .filter_map(|id| document.find(id))
        .map(format_node_line)
        .collect()
}

pub fn format_node_line(node: &TaskNode) -> String {
    format!(
        "{:>4}  {}[{}] {}",
        node.line_index + 1,
        "  ".repeat(node.depth.saturating_sub(1)),
        if node.checked { 'x' } else { ' ' },
        node.text
    )
}

pub fn format_relocation(relocation: &Relocation) -> String {
    format!(
        "moved {} line(s) {}:{} → {}:{} (depth {})",
        relocation.line_count(),
        relocation.source_path,
        relocation.removed.start + 1,
        relocation.destination_path,
        relocation.inserted_at + 1,
        relocation.new_depth
    )
}

pub fn format_deletion(deletion: &Deletion) -> String {
    format!(
        "deleted {} line(s) at {}:{}",
        deletion.lines.len(),
        deletion.path,
        deletion.removed.start + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::scan;
    use pretty_assertions::assert_eq;

    fn doc(text: &str) -> ParsedDocument {
        let lines: Vec<String> = text.split('\n').map(|l| l.to_string()).collect();
        scan("x.md", &lines)
    }

    #[test]
    fn test_format_tree_indents_by_depth() {
        let document = doc("# Today\n- [ ] a\n  - [x] b\n- [ ] c");
        assert_eq!(
            format_tree(&document),
            vec!["   2  [ ] a", "   3    [x] b", "   4  [ ] c"]
        );
    }

    #[test]
    fn test_tree_json_nests_children() {
        let document = doc("- [ ] a\n  - [ ] b\n    - [x] c\n- [ ] d");
        let json = tree_to_json(&document, None);
        assert_eq!(json.tasks.len(), 2);
        assert_eq!(json.tasks[0].children[0].text, "b");
        assert_eq!(json.tasks[0].children[0].children[0].line, 3);
        assert!(json.tasks[1].children.is_empty());
    }

    #[test]
    fn test_format_modified() {
        assert_eq!(
            format_modified(0).as_deref(),
            Some("1970-01-01T00:00:00+00:00")
        );
    }
}
