use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::io::store::{ChangeCallback, DocumentStore, StoreError, Subscription};
use crate::model::document::{ChangeKind, DocumentChange, DocumentMeta, join_lines, split_lines};

type SharedCallback = Arc<dyn Fn(DocumentChange) + Send + Sync + 'static>;

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, (u64, Vec<String>)>,
    clock: u64,
    failing: HashSet<String>,
}

/// In-memory document store. Every write advances a store-wide clock, which
/// doubles as the document's modification timestamp.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    subscribers: Arc<Mutex<Vec<(u64, SharedCallback)>>>,
    next_subscriber: Arc<Mutex<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<'a>(docs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (path, text) in docs {
                inner.clock += 1;
                let stamp = inner.clock;
                inner.docs.insert(path.to_string(), (stamp, split_lines(text)));
            }
        }
        store
    }

    /// Create or replace a document from text, notifying subscribers.
    pub fn insert(&self, path: &str, text: &str) {
        let existed = {
            let mut inner = self.lock();
            inner.clock += 1;
            let stamp = inner.clock;
            inner
                .docs
                .insert(path.to_string(), (stamp, split_lines(text)))
                .is_some()
        };
        let kind = if existed {
            ChangeKind::Modified
        } else {
            ChangeKind::Created
        };
        self.notify(DocumentChange::new(path, kind));
    }

    pub fn remove(&self, path: &str) -> bool {
        let removed = self.lock().docs.remove(path).is_some();
        if removed {
            self.notify(DocumentChange::new(path, ChangeKind::Deleted));
        }
        removed
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            let (_, lines) = inner
                .docs
                .remove(from)
                .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
            inner.clock += 1;
            let stamp = inner.clock;
            inner.docs.insert(to.to_string(), (stamp, lines));
        }
        self.notify(DocumentChange::renamed(from, to));
        Ok(())
    }

    /// Full text of a document, if present
    pub fn text(&self, path: &str) -> Option<String> {
        self.lock().docs.get(path).map(|(_, lines)| join_lines(lines))
    }

    /// Make every later write to `path` fail.
    pub fn fail_writes(&self, path: &str) {
        self.lock().failing.insert(path.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, change: DocumentChange) {
        // Snapshot first so callbacks may re-enter the store
        let callbacks: Vec<SharedCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(change.clone());
        }
    }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self) -> Result<Vec<DocumentMeta>, StoreError> {
        Ok(self
            .lock()
            .docs
            .iter()
            .map(|(path, (stamp, _))| DocumentMeta::new(path.clone(), *stamp))
            .collect())
    }

    fn metadata(&self, path: &str) -> Result<DocumentMeta, StoreError> {
        self.lock()
            .docs
            .get(path)
            .map(|(stamp, _)| DocumentMeta::new(path, *stamp))
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn read_lines(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.lock()
            .docs
            .get(path)
            .map(|(_, lines)| lines.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn write_lines(&self, path: &str, lines: &[String]) -> Result<(), StoreError> {
        let existed = {
            let mut inner = self.lock();
            if inner.failing.contains(path) {
                return Err(StoreError::WriteError {
                    path: PathBuf::from(path),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "write refused"),
                });
            }
            inner.clock += 1;
            let stamp = inner.clock;
            inner
                .docs
                .insert(path.to_string(), (stamp, lines.to_vec()))
                .is_some()
        };
        let kind = if existed {
            ChangeKind::Modified
        } else {
            ChangeKind::Created
        };
        self.notify(DocumentChange::new(path, kind));
        Ok(())
    }

    fn subscribe(&self, callback: ChangeCallback) -> Result<Subscription, StoreError> {
        let id = {
            let mut next = self.next_subscriber.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::from(callback)));

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(move || {
            subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|(sub_id, _)| *sub_id != id);
        }))
    }
}
