use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;

use crate::io::store::{ChangeCallback, DocumentStore, StoreError, Subscription};
use crate::model::config::DocumentsConfig;
use crate::model::document::{
    ChangeKind, DocumentChange, DocumentMeta, join_lines, normalize_path, split_lines,
};

/// Document store backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    filter: DocumentFilter,
}

/// Which files under the root count as documents
#[derive(Debug, Clone)]
struct DocumentFilter {
    extensions: Vec<String>,
    exclude: Vec<String>,
}

impl DocumentFilter {
    fn accepts_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn excludes_dir(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name)
    }

    /// Whether a root-relative path lies in an excluded directory
    fn excludes_path(&self, rel: &Path) -> bool {
        rel.parent().is_some_and(|dir| {
            dir.components().any(|c| match c {
                Component::Normal(name) => name.to_str().is_some_and(|n| self.excludes_dir(n)),
                _ => false,
            })
        })
    }
}

impl FsStore {
    pub fn new(root: &Path, documents: &DocumentsConfig) -> Result<Self, StoreError> {
        let root = fs::canonicalize(root).map_err(|e| StoreError::ReadError {
            path: root.to_path_buf(),
            source: e,
        })?;
        Ok(FsStore {
            root,
            filter: DocumentFilter {
                extensions: documents.extensions.clone(),
                exclude: documents.exclude.clone(),
            },
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized store path plus the absolute path it names
    fn resolve(&self, path: &str) -> Result<(String, PathBuf), StoreError> {
        let rel = normalize_path(path).ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let full = self.root.join(&rel);
        Ok((rel, full))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<DocumentMeta>) -> Result<(), StoreError> {
        let entries = fs::read_dir(dir).map_err(|e| StoreError::ReadError {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let read_error = |path: &Path| {
            let path = path.to_path_buf();
            move |e: io::Error| StoreError::ReadError { path, source: e }
        };

        for entry in entries {
            let entry = entry.map_err(read_error(dir))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(read_error(&path))?;

            if file_type.is_dir() {
                let name = entry.file_name();
                if name.to_str().is_some_and(|n| self.filter.excludes_dir(n)) {
                    continue;
                }
                self.walk(&path, out)?;
            } else if file_type.is_file() && self.filter.accepts_file(&path) {
                if let Some(rel) = relative_path(&self.root, &path) {
                    let meta = entry.metadata().map_err(read_error(&path))?;
                    out.push(DocumentMeta::new(rel, modified_millis(&meta)));
                }
            }
        }
        Ok(())
    }
}

impl DocumentStore for FsStore {
    fn list_documents(&self) -> Result<Vec<DocumentMeta>, StoreError> {
        let mut docs = Vec::new();
        self.walk(&self.root, &mut docs)?;
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }

    fn metadata(&self, path: &str) -> Result<DocumentMeta, StoreError> {
        let (rel, full) = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| not_found_or(path, &full, e))?;
        Ok(DocumentMeta::new(rel, modified_millis(&meta)))
    }

    fn read_lines(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let (_, full) = self.resolve(path)?;
        let text = fs::read_to_string(&full).map_err(|e| not_found_or(path, &full, e))?;
        Ok(split_lines(&text))
    }

    fn write_lines(&self, path: &str, lines: &[String]) -> Result<(), StoreError> {
        let (_, full) = self.resolve(path)?;
        atomic_write(&full, join_lines(lines).as_bytes()).map_err(|e| StoreError::WriteError {
            path: full,
            source: e,
        })
    }

    fn subscribe(&self, callback: ChangeCallback) -> Result<Subscription, StoreError> {
        let root = self.root.clone();
        let filter = self.filter.clone();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "file watcher error");
                        return;
                    }
                };
                for change in changes_from_event(&root, &filter, event) {
                    callback(change);
                }
            },
            Config::default(),
        )
        .map_err(|e| StoreError::WatchError {
            path: self.root.clone(),
            source: e,
        })?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| StoreError::WatchError {
                path: self.root.clone(),
                source: e,
            })?;

        Ok(Subscription::new(move || drop(watcher)))
    }
}

/// Translate a raw watcher event into document changes, dropping anything
/// outside the root or not matching the document filter.
fn changes_from_event(root: &Path, filter: &DocumentFilter, event: Event) -> Vec<DocumentChange> {
    let relevant = |p: &Path| -> Option<String> {
        if !filter.accepts_file(p) {
            return None;
        }
        let rel = p.strip_prefix(root).ok()?;
        if filter.excludes_path(rel) {
            return None;
        }
        relative_path(root, p)
    };

    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            match (relevant(&event.paths[0]), relevant(&event.paths[1])) {
                (Some(from), Some(to)) => vec![DocumentChange::renamed(from, to)],
                (Some(from), None) => vec![DocumentChange::new(from, ChangeKind::Deleted)],
                (None, Some(to)) => vec![DocumentChange::new(to, ChangeKind::Created)],
                (None, None) => Vec::new(),
            }
        }
        kind => {
            let change_kind = match kind {
                EventKind::Create(_) => ChangeKind::Created,
                EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
                EventKind::Modify(_) => ChangeKind::Modified,
                EventKind::Remove(_) => ChangeKind::Deleted,
                _ => return Vec::new(),
            };
            event
                .paths
                .iter()
                .filter_map(|p| relevant(p))
                .map(|p| DocumentChange::new(p, change_kind))
                .collect()
        }
    }
}

/// Root-relative path with `/` separators
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn modified_millis(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis() as u64)
}

fn not_found_or(path: &str, full: &Path, e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::ReadError {
            path: full.to_path_buf(),
            source: e,
        }
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
