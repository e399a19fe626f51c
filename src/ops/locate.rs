use crate::model::document::normalize_path;
use crate::model::node::{ParsedDocument, TaskNode};

/// Error type for resolving `path:line` locators
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("malformed locator '{0}' (expected path:line)")]
    Malformed(String),
    #[error("no task at {path}:{line}")]
    NoTask { path: String, line: usize },
}

/// A document path plus a zero-based line index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub path: String,
    pub line_index: usize,
}

/// Parse `path:line` where `line` is 1-based, as printed by `tn tree`.
pub fn parse_locator(input: &str) -> Result<Locator, LocateError> {
    let malformed = || LocateError::Malformed(input.to_string());
    let (path, line) = input.rsplit_once(':').ok_or_else(malformed)?;
    let path = normalize_path(path).ok_or_else(malformed)?;
    let line: usize = line.trim().parse().map_err(|_| malformed())?;
    if line == 0 {
        return Err(malformed());
    }
    Ok(Locator {
        path,
        line_index: line - 1,
    })
}

/// The task node at `locator` in a freshly parsed `document`.
pub fn locate_node(document: &ParsedDocument, locator: &Locator) -> Result<TaskNode, LocateError> {
    document
        .node_at(locator.line_index)
        .cloned()
        .ok_or_else(|| LocateError::NoTask {
            path: locator.path.clone(),
            line: locator.line_index + 1,
        })
}
