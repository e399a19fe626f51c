use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::io::store::{DocumentStore, StoreError};
use crate::model::document::DocumentMeta;
use crate::model::node::ParsedDocument;
use crate::parse::scan;

struct CacheEntry {
    modified: u64,
    parsed: Arc<ParsedDocument>,
}

/// Scanner output memoized per document, keyed by (path, modified).
///
/// Entries are only dropped through [`ParseCache::invalidate`] or a changed
/// timestamp; nothing is tied to the lifetime of the returned documents.
#[derive(Default)]
pub struct ParseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

static GLOBAL: OnceLock<ParseCache> = OnceLock::new();

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> &'static ParseCache {
        GLOBAL.get_or_init(ParseCache::new)
    }

    /// Return the cached parse when the timestamp is unchanged, otherwise
    /// read and scan the document and remember the result.
    pub fn get_or_parse(
        &self,
        store: &dyn DocumentStore,
        meta: &DocumentMeta,
    ) -> Result<Arc<ParsedDocument>, StoreError> {
        if let Some(entry) = self.lock().get(&meta.path)
            && entry.modified == meta.modified
        {
            tracing::debug!(path = %meta.path, "parse cache hit");
            return Ok(Arc::clone(&entry.parsed));
        }

        tracing::debug!(path = %meta.path, modified = meta.modified, "parse cache miss");
        let lines = store.read_lines(&meta.path)?;
        let parsed = Arc::new(scan(&meta.path, &lines));
        self.lock().insert(
            meta.path.clone(),
            CacheEntry {
                modified: meta.modified,
                parsed: Arc::clone(&parsed),
            },
        );
        Ok(parsed)
    }

    /// Fetch current metadata from the store, then [`Self::get_or_parse`].
    pub fn get_or_parse_path(
        &self,
        store: &dyn DocumentStore,
        path: &str,
    ) -> Result<Arc<ParsedDocument>, StoreError> {
        let meta = store.metadata(path)?;
        self.get_or_parse(store, &meta)
    }

    pub fn invalidate(&self, path: &str) {
        if self.lock().remove(path).is_some() {
            tracing::debug!(path, "parse cache invalidated");
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
