use crate::io::cache::ParseCache;
use crate::io::squelch::Squelch;
use crate::io::store::{DocumentStore, StoreError};
use crate::model::node::TaskNode;
use crate::parse::line::{with_checked, with_text};

/// Error type for single-line edits
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{path}:{} no longer holds the expected task; re-scan and retry", .line + 1)]
    Stale { path: String, line: usize },
    #[error("task text cannot be empty")]
    EmptyText,
}

/// Check or uncheck a task. Returns the rewritten line.
pub fn set_checked(
    store: &dyn DocumentStore,
    cache: &ParseCache,
    squelch: &Squelch,
    node: &TaskNode,
    checked: bool,
) -> Result<String, EditError> {
    rewrite_line(store, cache, squelch, node, |line| with_checked(line, checked))
}

/// Replace a task's text, keeping its indent, bullet and checkbox.
pub fn set_text(
    store: &dyn DocumentStore,
    cache: &ParseCache,
    squelch: &Squelch,
    node: &TaskNode,
    text: &str,
) -> Result<String, EditError> {
    if text.trim().is_empty() {
        return Err(EditError::EmptyText);
    }
    rewrite_line(store, cache, squelch, node, |line| with_text(line, text))
}

fn rewrite_line(
    store: &dyn DocumentStore,
    cache: &ParseCache,
    squelch: &Squelch,
    node: &TaskNode,
    rewrite: impl FnOnce(&str) -> Option<String>,
) -> Result<String, EditError> {
    let _squelch = squelch.hold();
    let result = rewrite_inner(store, node, rewrite);
    cache.invalidate(&node.document_path);
    result
}

fn rewrite_inner(
    store: &dyn DocumentStore,
    node: &TaskNode,
    rewrite: impl FnOnce(&str) -> Option<String>,
) -> Result<String, EditError> {
    let stale = || EditError::Stale {
        path: node.document_path.clone(),
        line: node.line_index,
    };

    let mut lines = store.read_lines(&node.document_path)?;
    let current = lines.get_mut(node.line_index).ok_or_else(stale)?;
    if *current != node.raw_line {
        return Err(stale());
    }
    let updated = rewrite(current.as_str()).ok_or_else(stale)?;
    if updated == *current {
        return Ok(updated);
    }
    *current = updated.clone();

    store.write_lines(&node.document_path, &lines)?;
    tracing::info!(path = %node.document_path, line = node.line_index, "rewrote task line");
    Ok(updated)
}
