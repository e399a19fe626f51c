use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// A candidate document as reported by the store. Content is read on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Store-relative path with `/` separators
    pub path: String,
    /// Modification timestamp in milliseconds; monotonic per document
    pub modified: u64,
}

impl DocumentMeta {
    pub fn new(path: impl Into<String>, modified: u64) -> Self {
        DocumentMeta {
            path: path.into(),
            modified,
        }
    }

    /// File name without directory or extension (`Proj/notes.md` → `notes`)
    pub fn display_name(&self) -> &str {
        display_name(&self.path)
    }
}

pub fn display_name(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

/// Canonical form of a store-relative path: normal components joined with
/// `/`, `.` dropped. `None` for empty, absolute or escaping paths.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Deleted => "deleted",
        })
    }
}

/// A change notification from the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub path: String,
    pub kind: ChangeKind,
    /// Previous path, for renames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl DocumentChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        DocumentChange {
            path: path.into(),
            kind,
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        DocumentChange {
            path: new_path.into(),
            kind: ChangeKind::Renamed,
            old_path: Some(old_path.into()),
        }
    }
}

/// Split document text into lines. A trailing newline shows up as a final
/// empty line so `join_lines(split_lines(s)) == s`.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(|l| l.to_string()).collect()
}

pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}
