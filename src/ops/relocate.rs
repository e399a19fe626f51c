use std::ops::Range;

use crate::io::cache::ParseCache;
use crate::io::squelch::Squelch;
use crate::io::store::{DocumentStore, StoreError};
use crate::model::document::normalize_path;
use crate::model::node::TaskNode;
use crate::parse::line::{classify, with_depth};

/// Error type for relocation operations
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{path}:{} no longer holds the expected task; re-scan and retry", .line + 1)]
    Stale { path: String, line: usize },
    #[error("cannot move a task into its own subtree")]
    IntoOwnSubtree,
}

/// Where a relocated block should land
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    /// Directly below `parent`, one level deeper
    FirstChildOf(&'a TaskNode),
    /// Before or after `anchor`, adopting the deeper of its new neighbours
    Sibling { anchor: &'a TaskNode, after: bool },
    /// At the end of a document, before a trailing empty line
    EndOf { path: &'a str, depth: usize },
}

impl Destination<'_> {
    fn path(&self) -> &str {
        match self {
            Destination::FirstChildOf(node) => &node.document_path,
            Destination::Sibling { anchor, .. } => &anchor.document_path,
            Destination::EndOf { path, .. } => *path,
        }
    }

    fn anchor(&self) -> Option<&TaskNode> {
        match self {
            Destination::FirstChildOf(node) => Some(*node),
            Destination::Sibling { anchor, .. } => Some(*anchor),
            Destination::EndOf { .. } => None,
        }
    }
}

/// What a move did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub source_path: String,
    pub destination_path: String,
    /// Lines removed from the source (exclusive end)
    pub removed: Range<usize>,
    /// Index of the block's first line in the destination after the move
    pub inserted_at: usize,
    pub new_depth: usize,
}

impl Relocation {
    pub fn line_count(&self) -> usize {
        self.removed.len()
    }
}

/// What a delete did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub path: String,
    pub removed: Range<usize>,
    pub lines: Vec<String>,
}

/// The line range of the task at `start` plus every following task line
/// indented deeper than `depth`. Stops at the first non-task line or at the
/// first task at `depth` or shallower.
pub fn extract_block(lines: &[String], start: usize, depth: usize) -> Range<usize> {
    if start >= lines.len() {
        return start..start;
    }
    let mut end = start + 1;
    while let Some(line) = lines.get(end) {
        match classify(line) {
            Some(task) if task.depth() > depth => end += 1,
            _ => break,
        }
    }
    start..end
}

/// Shift every task line in `block` by `delta` levels (never above depth 1).
/// Bullet, checkbox and text stay verbatim; a zero delta returns the block
/// byte-for-byte.
pub fn adjust_block_depth(block: &[String], delta: isize) -> Vec<String> {
    block
        .iter()
        .map(|line| match classify(line) {
            Some(task) => {
                let depth = (task.depth() as isize + delta).max(1) as usize;
                with_depth(line, depth)
            }
            None => line.clone(),
        })
        .collect()
}

/// Depth for a sibling inserted at `index`: the deeper of the adjacent
/// lines, with non-task or missing neighbours counting as nothing.
fn sibling_depth(lines: &[String], index: usize) -> usize {
    let depth_at = |i: usize| lines.get(i).and_then(|l| classify(l)).map_or(0, |t| t.depth());
    let above = index.checked_sub(1).map_or(0, depth_at);
    let below = depth_at(index);
    above.max(below).max(1)
}

/// Append position: the end, or just before a single trailing empty line.
fn end_index(lines: &[String]) -> usize {
    match lines.last() {
        Some(last) if last.is_empty() => lines.len() - 1,
        _ => lines.len(),
    }
}

/// Path in canonical store form, so aliases like `./a.md` name one document
fn store_path(path: &str) -> String {
    normalize_path(path).unwrap_or_else(|| path.to_string())
}

fn ensure_current(lines: &[String], node: &TaskNode) -> Result<(), RelocateError> {
    if lines.get(node.line_index) == Some(&node.raw_line) {
        Ok(())
    } else {
        Err(RelocateError::Stale {
            path: node.document_path.clone(),
            line: node.line_index,
        })
    }
}

/// Moves and deletes task subtrees by rewriting document lines directly.
///
/// Every operation re-reads the documents it touches, holds the squelch for
/// all of its writes, and invalidates the parse cache for each touched path
/// whether or not it succeeds. Node references must come from a scan of the
/// current document contents.
pub struct Relocator<'a> {
    store: &'a dyn DocumentStore,
    cache: &'a ParseCache,
    squelch: &'a Squelch,
}

impl<'a> Relocator<'a> {
    pub fn new(store: &'a dyn DocumentStore, cache: &'a ParseCache, squelch: &'a Squelch) -> Self {
        Relocator {
            store,
            cache,
            squelch,
        }
    }

    pub fn move_as_first_child(
        &self,
        source: &TaskNode,
        parent: &TaskNode,
    ) -> Result<Relocation, RelocateError> {
        self.relocate(source, Destination::FirstChildOf(parent))
    }

    pub fn move_as_sibling(
        &self,
        source: &TaskNode,
        anchor: &TaskNode,
        after: bool,
    ) -> Result<Relocation, RelocateError> {
        self.relocate(source, Destination::Sibling { anchor, after })
    }

    pub fn move_to_end(
        &self,
        source: &TaskNode,
        path: &str,
        depth: usize,
    ) -> Result<Relocation, RelocateError> {
        self.relocate(source, Destination::EndOf { path, depth })
    }

    pub fn relocate(
        &self,
        source: &TaskNode,
        destination: Destination<'_>,
    ) -> Result<Relocation, RelocateError> {
        let _squelch = self.squelch.hold();
        let source_path = store_path(&source.document_path);
        let dest_path = store_path(destination.path());
        let result = if source_path == dest_path {
            self.relocate_within(source, destination)
        } else {
            self.relocate_across(source, destination)
        };
        self.cache.invalidate(&source.document_path);
        self.cache.invalidate(&dest_path);
        result
    }

    /// Remove `node` and its descendants.
    pub fn delete_subtree(&self, node: &TaskNode) -> Result<Deletion, RelocateError> {
        let _squelch = self.squelch.hold();
        let result = self.delete_inner(node);
        self.cache.invalidate(&node.document_path);
        result
    }

    fn delete_inner(&self, node: &TaskNode) -> Result<Deletion, RelocateError> {
        let mut lines = self.store.read_lines(&node.document_path)?;
        ensure_current(&lines, node)?;

        let block = extract_block(&lines, node.line_index, node.depth);
        let removed: Vec<String> = lines.drain(block.clone()).collect();
        self.store.write_lines(&node.document_path, &lines)?;
        tracing::info!(
            path = %node.document_path,
            start = block.start,
            lines = removed.len(),
            "deleted task subtree"
        );

        Ok(Deletion {
            path: node.document_path.clone(),
            removed: block,
            lines: removed,
        })
    }

    /// Source and destination are the same document: splice out, shift the
    /// insertion point past the removed range, splice in, write once.
    fn relocate_within(
        &self,
        source: &TaskNode,
        destination: Destination<'_>,
    ) -> Result<Relocation, RelocateError> {
        let path = source.document_path.as_str();
        let mut lines = self.store.read_lines(path)?;
        ensure_current(&lines, source)?;
        if let Some(anchor) = destination.anchor() {
            ensure_current(&lines, anchor)?;
        }

        let block = extract_block(&lines, source.line_index, source.depth);
        let raw_index = match destination {
            Destination::FirstChildOf(parent) => {
                if block.contains(&parent.line_index) {
                    return Err(RelocateError::IntoOwnSubtree);
                }
                Some(parent.line_index + 1)
            }
            Destination::Sibling { anchor, after } => {
                if anchor.line_index != block.start && block.contains(&anchor.line_index) {
                    return Err(RelocateError::IntoOwnSubtree);
                }
                Some(anchor.line_index + usize::from(after))
            }
            Destination::EndOf { .. } => None,
        };
        if let Some(index) = raw_index
            && index > block.start
            && index < block.end
        {
            return Err(RelocateError::IntoOwnSubtree);
        }

        let moved: Vec<String> = lines.drain(block.clone()).collect();
        let index = match raw_index {
            Some(i) if i >= block.end => i - moved.len(),
            Some(i) => i,
            None => end_index(&lines),
        };
        let index = index.min(lines.len());

        let new_depth = match destination {
            Destination::FirstChildOf(parent) => parent.depth + 1,
            Destination::Sibling { .. } => sibling_depth(&lines, index),
            Destination::EndOf { depth, .. } => depth.max(1),
        };
        let adjusted = adjust_block_depth(&moved, new_depth as isize - source.depth as isize);
        lines.splice(index..index, adjusted);

        self.store.write_lines(path, &lines)?;
        tracing::info!(path, from = block.start, to = index, lines = moved.len(), "moved task subtree");

        Ok(Relocation {
            source_path: path.to_string(),
            destination_path: path.to_string(),
            removed: block,
            inserted_at: index,
            new_depth,
        })
    }

    /// Different documents: both are read up front, the source is written
    /// first, then the destination. If the destination write fails the
    /// source is restored on a best-effort basis.
    fn relocate_across(
        &self,
        source: &TaskNode,
        destination: Destination<'_>,
    ) -> Result<Relocation, RelocateError> {
        let source_path = source.document_path.as_str();
        let dest_path = destination.path();

        let mut source_lines = self.store.read_lines(source_path)?;
        ensure_current(&source_lines, source)?;
        let mut dest_lines = self.store.read_lines(dest_path)?;
        if let Some(anchor) = destination.anchor() {
            ensure_current(&dest_lines, anchor)?;
        }

        let source_backup = source_lines.clone();
        let block = extract_block(&source_lines, source.line_index, source.depth);
        let moved: Vec<String> = source_lines.drain(block.clone()).collect();

        let index = match destination {
            Destination::FirstChildOf(parent) => parent.line_index + 1,
            Destination::Sibling { anchor, after } => anchor.line_index + usize::from(after),
            Destination::EndOf { .. } => end_index(&dest_lines),
        }
        .min(dest_lines.len());
        let new_depth = match destination {
            Destination::FirstChildOf(parent) => parent.depth + 1,
            Destination::Sibling { .. } => sibling_depth(&dest_lines, index),
            Destination::EndOf { depth, .. } => depth.max(1),
        };
        let adjusted = adjust_block_depth(&moved, new_depth as isize - source.depth as isize);
        dest_lines.splice(index..index, adjusted);

        self.store.write_lines(source_path, &source_lines)?;
        if let Err(e) = self.store.write_lines(dest_path, &dest_lines) {
            if let Err(restore) = self.store.write_lines(source_path, &source_backup) {
                tracing::warn!(path = source_path, error = %restore, "could not restore source after failed move");
            }
            return Err(e.into());
        }
        tracing::info!(
            from = source_path,
            to = dest_path,
            index,
            lines = moved.len(),
            "moved task subtree across documents"
        );

        Ok(Relocation {
            source_path: source_path.to_string(),
            destination_path: dest_path.to_string(),
            removed: block,
            inserted_at: index,
            new_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory_store::MemoryStore;
    use crate::model::node::ParsedDocument;
    use pretty_assertions::assert_eq;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(|l| l.to_string()).collect()
    }

    struct Fixture {
        store: MemoryStore,
        cache: ParseCache,
        squelch: Squelch,
    }

    impl Fixture {
        fn new(docs: &[(&str, &str)]) -> Self {
            Fixture {
                store: MemoryStore::with_documents(docs.iter().copied()),
                cache: ParseCache::new(),
                squelch: Squelch::new(),
            }
        }

        fn relocator(&self) -> Relocator<'_> {
            Relocator::new(&self.store, &self.cache, &self.squelch)
        }

        fn parse(&self, path: &str) -> std::sync::Arc<ParsedDocument> {
            self.cache.get_or_parse_path(&self.store, path).unwrap()
        }

        fn node(&self, path: &str, line: usize) -> TaskNode {
            self.parse(path).node_at(line).unwrap().clone()
        }

        fn text(&self, path: &str) -> String {
            self.store.text(path).unwrap()
        }
    }

    // --- block extraction ---

    #[test]
    fn test_extract_block_stops_at_sibling() {
        let doc = lines("- [ ] a\n  - [ ] b\n    - [ ] c\n  - [ ] d\n- [ ] e");
        assert_eq!(extract_block(&doc, 0, 1), 0..4);
        assert_eq!(extract_block(&doc, 1, 2), 1..3);
        assert_eq!(extract_block(&doc, 4, 1), 4..5);
    }

    #[test]
    fn test_extract_block_stops_at_prose() {
        let doc = lines("- [ ] a\n  - [ ] b\n  some note\n  - [ ] c");
        assert_eq!(extract_block(&doc, 0, 1), 0..2);
    }

    #[test]
    fn test_extract_block_stops_at_blank_line() {
        let doc = lines("- [ ] a\n\n  - [ ] b");
        assert_eq!(extract_block(&doc, 0, 1), 0..1);
    }

    // --- depth adjustment ---

    #[test]
    fn test_adjust_zero_delta_is_identity() {
        let block = lines("\t- [ ] a\n\t\t* [X] b\n   - [x] odd");
        assert_eq!(adjust_block_depth(&block, 0), block);
    }

    #[test]
    fn test_adjust_shifts_and_normalizes() {
        let block = lines("- [ ] a\n\t* [x] b\n    - [ ] c");
        assert_eq!(
            adjust_block_depth(&block, 1),
            lines("  - [ ] a\n    * [x] b\n      - [ ] c")
        );
        assert_eq!(
            adjust_block_depth(&lines("    - [ ] a\n      - [ ] b\n  - [ ] c"), -2),
            lines("- [ ] a\n  - [ ] b\n- [ ] c")
        );
    }

    #[test]
    fn test_sibling_depth_and_end_index() {
        let doc = lines("- [ ] a\n  - [ ] b\n- [ ] c\n");
        assert_eq!(sibling_depth(&doc, 2), 2);
        assert_eq!(sibling_depth(&doc, 0), 1);
        assert_eq!(sibling_depth(&doc, 4), 1);
        assert_eq!(end_index(&doc), 3);
        assert_eq!(end_index(&lines("- [ ] a")), 1);
    }

    // --- moves within one document ---

    #[test]
    fn test_move_as_first_child_same_document() {
        let fx = Fixture::new(&[("A.md", "- [ ] Buy milk\n  - [ ] 2% milk\n- [ ] Walk dog")]);
        let milk = fx.node("A.md", 0);
        let dog = fx.node("A.md", 2);

        let report = fx.relocator().move_as_first_child(&dog, &milk).unwrap();
        assert_eq!(
            fx.text("A.md"),
            "- [ ] Buy milk\n  - [ ] Walk dog\n  - [ ] 2% milk"
        );
        assert_eq!(report.removed, 2..3);
        assert_eq!(report.inserted_at, 1);
        assert_eq!(report.new_depth, 2);
        assert!(!fx.cache.contains("A.md"));
        assert!(!fx.squelch.is_active());
    }

    #[test]
    fn test_move_down_compensates_index() {
        let fx = Fixture::new(&[(
            "a.md",
            "- [ ] one\n  - [ ] one.a\n- [ ] two\n- [ ] three",
        )]);
        let one = fx.node("a.md", 0);
        let three = fx.node("a.md", 3);

        fx.relocator().move_as_sibling(&one, &three, true).unwrap();
        assert_eq!(
            fx.text("a.md"),
            "- [ ] two\n- [ ] three\n- [ ] one\n  - [ ] one.a"
        );
    }

    #[test]
    fn test_sibling_before_adopts_deeper_neighbour() {
        let fx = Fixture::new(&[("a.md", "- [ ] p\n  - [ ] c1\n  - [ ] c2\n- [ ] loose")]);
        let loose = fx.node("a.md", 3);
        let c2 = fx.node("a.md", 2);

        let report = fx.relocator().move_as_sibling(&loose, &c2, false).unwrap();
        assert_eq!(report.new_depth, 2);
        assert_eq!(
            fx.text("a.md"),
            "- [ ] p\n  - [ ] c1\n  - [ ] loose\n  - [ ] c2"
        );
    }

    #[test]
    fn test_move_to_end_before_trailing_blank() {
        let fx = Fixture::new(&[("a.md", "- [ ] a\n  - [ ] a1\n- [ ] b\n")]);
        let a1 = fx.node("a.md", 1);

        let report = fx.relocator().move_to_end(&a1, "a.md", 1).unwrap();
        assert_eq!(fx.text("a.md"), "- [ ] a\n- [ ] b\n- [ ] a1\n");
        assert_eq!(report.inserted_at, 2);
    }

    #[test]
    fn test_move_to_end_through_aliased_path() {
        let fx = Fixture::new(&[("a.md", "- [ ] one\n- [ ] two\n")]);
        let one = fx.node("a.md", 0);

        let report = fx.relocator().move_to_end(&one, "./a.md", 1).unwrap();
        assert_eq!(report.destination_path, "a.md");
        assert_eq!(fx.text("a.md"), "- [ ] two\n- [ ] one\n");
    }

    #[test]
    fn test_into_own_subtree_rejected_without_write() {
        let fx = Fixture::new(&[("a.md", "- [ ] a\n  - [ ] b\n    - [ ] c")]);
        let a = fx.node("a.md", 0);
        let c = fx.node("a.md", 2);
        let stamp = fx.store.metadata("a.md").unwrap().modified;

        assert!(matches!(
            fx.relocator().move_as_first_child(&a, &c),
            Err(RelocateError::IntoOwnSubtree)
        ));
        assert!(matches!(
            fx.relocator().move_as_first_child(&a, &a),
            Err(RelocateError::IntoOwnSubtree)
        ));
        assert!(matches!(
            fx.relocator().move_as_sibling(&a, &a, true),
            Err(RelocateError::IntoOwnSubtree)
        ));
        assert!(matches!(
            fx.relocator().move_as_sibling(&a, &c, true),
            Err(RelocateError::IntoOwnSubtree)
        ));
        assert!(matches!(
            fx.relocator().move_as_sibling(&a, &c, false),
            Err(RelocateError::IntoOwnSubtree)
        ));
        assert_eq!(fx.store.metadata("a.md").unwrap().modified, stamp);
    }

    #[test]
    fn test_sibling_before_self_is_noop_move() {
        let fx = Fixture::new(&[("a.md", "- [ ] a\n  - [ ] b\n- [ ] c")]);
        let a = fx.node("a.md", 0);
        fx.relocator().move_as_sibling(&a, &a, false).unwrap();
        assert_eq!(fx.text("a.md"), "- [ ] a\n  - [ ] b\n- [ ] c");
    }

    // --- moves across documents ---

    #[test]
    fn test_move_across_documents_rebases_depth() {
        let fx = Fixture::new(&[
            ("src.md", "- [ ] keep\n- [ ] go\n\t- [x] go.1\n\t\t- [ ] go.1.a\n- [ ] stay"),
            ("dst.md", "- [ ] target\n  - [ ] existing\n"),
        ]);
        let go = fx.node("src.md", 1);
        let existing = fx.node("dst.md", 1);

        let report = fx.relocator().move_as_sibling(&go, &existing, true).unwrap();
        assert_eq!(fx.text("src.md"), "- [ ] keep\n- [ ] stay");
        assert_eq!(
            fx.text("dst.md"),
            "- [ ] target\n  - [ ] existing\n  - [ ] go\n    - [x] go.1\n      - [ ] go.1.a\n"
        );
        assert_eq!(report.line_count(), 3);
        assert_eq!(report.new_depth, 2);
    }

    #[test]
    fn test_move_to_empty_document() {
        let fx = Fixture::new(&[("src.md", "- [ ] a\n  - [ ] b"), ("empty.md", "")]);
        let b = fx.node("src.md", 1);
        fx.relocator().move_to_end(&b, "empty.md", 1).unwrap();
        assert_eq!(fx.text("empty.md"), "- [ ] b\n");
        assert_eq!(fx.text("src.md"), "- [ ] a");
    }

    #[test]
    fn test_destination_write_failure_restores_source() {
        let fx = Fixture::new(&[("src.md", "- [ ] a\n- [ ] b"), ("dst.md", "- [ ] x")]);
        fx.store.fail_writes("dst.md");
        let a = fx.node("src.md", 0);

        let result = fx.relocator().move_to_end(&a, "dst.md", 1);
        assert!(matches!(result, Err(RelocateError::Store(StoreError::WriteError { .. }))));
        assert_eq!(fx.text("src.md"), "- [ ] a\n- [ ] b");
        assert_eq!(fx.text("dst.md"), "- [ ] x");
        assert!(!fx.squelch.is_active());
    }

    #[test]
    fn test_stale_source_rejected() {
        let fx = Fixture::new(&[("a.md", "- [ ] a\n- [ ] b")]);
        let b = fx.node("a.md", 1);
        fx.store.insert("a.md", "- [ ] new first\n- [ ] a\n- [ ] b");

        assert!(matches!(
            fx.relocator().delete_subtree(&b),
            Err(RelocateError::Stale { line: 1, .. })
        ));
        assert_eq!(fx.text("a.md"), "- [ ] new first\n- [ ] a\n- [ ] b");
    }

    // --- delete ---

    #[test]
    fn test_delete_subtree() {
        let fx = Fixture::new(&[("A.md", "- [ ] Buy milk\n  - [ ] 2% milk\n- [ ] Walk dog")]);
        let milk = fx.node("A.md", 0);

        let deletion = fx.relocator().delete_subtree(&milk).unwrap();
        assert_eq!(fx.text("A.md"), "- [ ] Walk dog");
        assert_eq!(deletion.removed, 0..2);
        assert_eq!(deletion.lines, lines("- [ ] Buy milk\n  - [ ] 2% milk"));
        assert!(!fx.cache.contains("A.md"));
    }

    #[test]
    fn test_delete_keeps_prose_after_block() {
        let fx = Fixture::new(&[("a.md", "- [ ] a\n  - [ ] b\nSome notes\n  - [ ] c")]);
        let a = fx.node("a.md", 0);
        fx.relocator().delete_subtree(&a).unwrap();
        assert_eq!(fx.text("a.md"), "Some notes\n  - [ ] c");
    }
}
