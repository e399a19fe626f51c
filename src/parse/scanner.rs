use crate::model::node::{ChildrenIndex, NodeId, ParsedDocument, TaskNode};
use crate::parse::line::classify;

/// Build the task forest for one document.
///
/// Parents come from line order alone: a node's parent is the nearest
/// preceding node with strictly smaller depth. Depth jumps of more than one
/// level are tolerated, so a depth-3 node directly under a depth-1 node gets
/// that depth-1 node as its parent.
pub fn scan(path: &str, lines: &[String]) -> ParsedDocument {
    let mut nodes: Vec<TaskNode> = Vec::new();
    let mut children = ChildrenIndex::new();

    let mut root_id = NodeId::placeholder_root(path);
    let mut root_token = String::new();
    // Indexes into `nodes`, depth strictly increasing from bottom to top
    let mut stack: Vec<usize> = Vec::new();

    for (line_index, line) in lines.iter().enumerate() {
        let Some(task) = classify(line) else {
            continue;
        };
        let depth = task.depth();
        let id = NodeId::new(path, line_index);

        if depth == 1 {
            root_id = id.clone();
            root_token = task.root_token();
        }

        while stack.last().is_some_and(|&top| nodes[top].depth >= depth) {
            stack.pop();
        }
        let parent_id = stack.last().map(|&top| nodes[top].id.clone());
        if let Some(parent) = &parent_id {
            children.push(parent.clone(), id.clone());
        }

        stack.push(nodes.len());
        nodes.push(TaskNode {
            id,
            document_path: path.to_string(),
            line_index,
            raw_line: line.clone(),
            depth,
            checked: task.checked(),
            text: task.text.to_string(),
            root_group_id: root_id.clone(),
            root_token: root_token.clone(),
            parent_id,
        });
    }

    ParsedDocument {
        path: path.to_string(),
        nodes,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(|l| l.to_string()).collect()
    }

    fn depths(doc: &ParsedDocument) -> Vec<usize> {
        doc.nodes.iter().map(|n| n.depth).collect()
    }

    #[test]
    fn test_scan_milk_list() {
        let doc = scan(
            "A.md",
            &lines("- [ ] Buy milk\n  - [ ] 2% milk\n- [ ] Walk dog"),
        );
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(depths(&doc), vec![1, 2, 1]);
        assert_eq!(doc.nodes[1].parent_id.as_ref(), Some(&doc.nodes[0].id));
        assert_eq!(doc.nodes[0].parent_id, None);
        assert_eq!(doc.nodes[2].parent_id, None);
        assert_eq!(doc.children.children_of(&doc.nodes[0].id), &[doc.nodes[1].id.clone()]);
    }

    #[test]
    fn test_scan_skips_prose_without_breaking_root_group() {
        let doc = scan(
            "notes.md",
            &lines("# Heading\n- [ ] Root\nsome prose\n  - [x] Child\n\n- [ ] Next"),
        );
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[1].line_index, 3);
        assert_eq!(doc.nodes[1].root_group_id, doc.nodes[0].id);
        assert_eq!(doc.nodes[1].root_token, "root");
        assert_eq!(doc.nodes[1].parent_id.as_ref(), Some(&doc.nodes[0].id));
        assert!(doc.nodes[1].checked);
        assert_eq!(doc.nodes[2].root_group_id, doc.nodes[2].id);
    }

    #[test]
    fn test_scan_depth_jump_attaches_to_nearest_shallower() {
        let doc = scan("a.md", &lines("- [ ] top\n      - [ ] deep\n  - [ ] mid"));
        assert_eq!(depths(&doc), vec![1, 4, 2]);
        assert_eq!(doc.nodes[1].parent_id.as_ref(), Some(&doc.nodes[0].id));
        assert_eq!(doc.nodes[2].parent_id.as_ref(), Some(&doc.nodes[0].id));
        assert_eq!(
            doc.children.children_of(&doc.nodes[0].id),
            &[doc.nodes[1].id.clone(), doc.nodes[2].id.clone()]
        );
    }

    #[test]
    fn test_scan_leading_indented_task_uses_placeholder_root() {
        let doc = scan("odd.md", &lines("    - [ ] orphan\n      - [ ] kid\n- [ ] real root"));
        assert_eq!(doc.nodes[0].parent_id, None);
        assert_eq!(doc.nodes[0].root_group_id, NodeId::placeholder_root("odd.md"));
        assert_eq!(doc.nodes[0].root_token, "");
        assert_eq!(doc.nodes[1].parent_id.as_ref(), Some(&doc.nodes[0].id));
        assert_eq!(doc.nodes[2].root_group_id, doc.nodes[2].id);
        assert_eq!(doc.roots().count(), 2);
    }

    #[test]
    fn test_parents_are_earlier_and_shallower() {
        let doc = scan(
            "p.md",
            &lines(
                "- [ ] a\n  - [ ] b\n    - [ ] c\n\t\t\t- [ ] d\n  - [ ] e\n- [ ] f\n\t- [ ] g\n      - [ ] h",
            ),
        );
        for node in &doc.nodes {
            if let Some(parent_id) = &node.parent_id {
                let parent = doc.find(parent_id).unwrap();
                assert!(parent.line_index < node.line_index);
                assert!(parent.depth < node.depth);
                assert_eq!(parent.document_path, node.document_path);
            }
        }
    }

    #[test]
    fn test_depth_first_walk_reproduces_line_order() {
        let doc = scan(
            "w.md",
            &lines("- [ ] a\n  - [ ] b\n      - [ ] c\n    - [ ] d\n  - [ ] e\nprose\n- [ ] f\n  - [ ] g"),
        );
        let roots: Vec<&NodeId> = doc.roots().map(|n| &n.id).collect();
        let walked: Vec<&NodeId> = doc.children.walk_depth_first(roots);
        let in_order: Vec<&NodeId> = doc.nodes.iter().map(|n| &n.id).collect();
        assert_eq!(walked, in_order);
    }

    #[test]
    fn test_node_at_and_raw_line() {
        let doc = scan("r.md", &lines("intro\n* [X] Shout\n  - [ ] quiet"));
        let node = doc.node_at(1).unwrap();
        assert_eq!(node.raw_line, "* [X] Shout");
        assert_eq!(node.text, "Shout");
        assert!(doc.node_at(0).is_none());
    }
}
