use std::fmt;
use std::path::PathBuf;

use crate::model::document::{DocumentChange, DocumentMeta};

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid document path: {0}")]
    InvalidPath(String),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not watch {path}: {source}")]
    WatchError {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Callback invoked for every change notification.
pub type ChangeCallback = Box<dyn Fn(DocumentChange) + Send + Sync + 'static>;

/// The host side of document storage. Everything the core reads or writes
/// goes through this trait.
pub trait DocumentStore {
    /// All candidate documents with their modification timestamps
    fn list_documents(&self) -> Result<Vec<DocumentMeta>, StoreError>;

    /// Current modification timestamp of one document
    fn metadata(&self, path: &str) -> Result<DocumentMeta, StoreError>;

    fn read_lines(&self, path: &str) -> Result<Vec<String>, StoreError>;

    fn write_lines(&self, path: &str, lines: &[String]) -> Result<(), StoreError>;

    /// Receive change notifications until the returned handle is dropped or
    /// unsubscribed.
    fn subscribe(&self, callback: ChangeCallback) -> Result<Subscription, StoreError>;
}

/// Unsubscribe handle for a change subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
