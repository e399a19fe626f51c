use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use crate::io::cache::ParseCache;
use crate::io::config_io::{self, ConfigError};
use crate::io::fs_store::FsStore;
use crate::io::squelch::Squelch;
use crate::io::store::{DocumentStore, StoreError, Subscription};
use crate::model::bucket::Grouping;
use crate::model::config::NestConfig;
use crate::model::document::{ChangeKind, DocumentChange};
use crate::model::node::{ParsedDocument, TaskNode};
use crate::ops::grouping::group_documents;
use crate::ops::locate::{LocateError, Locator, locate_node};
use crate::ops::relocate::Relocator;
use crate::ops::rules::{CompiledRule, compile_rules};

/// Error type for opening and querying a workspace
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Locate(#[from] LocateError),
}

/// What a change notification means for the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Raised by one of our own writes
    Suppressed,
    /// External edit; the affected paths were invalidated
    Rescan,
}

/// A directory of task documents plus its configuration, compiled rules,
/// parse cache and squelch.
pub struct Workspace {
    root: PathBuf,
    config: NestConfig,
    store: FsStore,
    cache: &'static ParseCache,
    squelch: Squelch,
    rules: Vec<CompiledRule>,
}

impl Workspace {
    /// Discover tasknest.toml from `start` upward and open that workspace.
    pub fn open(start: &Path) -> Result<Self, WorkspaceError> {
        let root = config_io::discover_root(start)?;
        Self::load(&root, ParseCache::global())
    }

    /// Open the workspace rooted at `root` with an explicit cache.
    pub fn load(root: &Path, cache: &'static ParseCache) -> Result<Self, WorkspaceError> {
        let config = config_io::load_config(root)?;
        let store = FsStore::new(root, &config.documents)?;
        let rules = compile_rules(&config.rules);
        if rules.len() < config.rules.len() {
            tracing::warn!(
                dropped = config.rules.len() - rules.len(),
                "ignoring rules with invalid patterns"
            );
        }
        Ok(Workspace {
            root: store.root().to_path_buf(),
            config,
            store,
            cache,
            squelch: Squelch::new(),
            rules,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &NestConfig {
        &self.config
    }

    pub fn store(&self) -> &FsStore {
        &self.store
    }

    pub fn cache(&self) -> &ParseCache {
        self.cache
    }

    pub fn squelch(&self) -> &Squelch {
        &self.squelch
    }

    /// List documents and bucket them by the configured rules.
    pub fn scan(&self) -> Result<Grouping, StoreError> {
        let documents = self.store.list_documents()?;
        group_documents(&self.store, self.cache, &documents, &self.rules)
    }

    pub fn parse(&self, path: &str) -> Result<Arc<ParsedDocument>, StoreError> {
        self.cache.get_or_parse_path(&self.store, path)
    }

    /// Resolve a locator against the document's current contents.
    pub fn locate(&self, locator: &Locator) -> Result<TaskNode, WorkspaceError> {
        let document = self.parse(&locator.path)?;
        Ok(locate_node(&document, locator)?)
    }

    pub fn relocator(&self) -> Relocator<'_> {
        Relocator::new(&self.store, self.cache, &self.squelch)
    }

    /// Classify a change notification and invalidate what it touched.
    pub fn handle_change(&self, change: &DocumentChange) -> ChangeOutcome {
        if self.squelch.is_active() {
            return ChangeOutcome::Suppressed;
        }
        self.cache.invalidate(&change.path);
        if change.kind == ChangeKind::Renamed
            && let Some(old) = &change.old_path
        {
            self.cache.invalidate(old);
        }
        ChangeOutcome::Rescan
    }

    /// Subscribe to document changes. Events queue on the returned receiver
    /// until the subscription is dropped.
    pub fn watch(&self) -> Result<(Subscription, mpsc::Receiver<DocumentChange>), StoreError> {
        let (tx, rx) = mpsc::channel();
        let subscription = self.store.subscribe(Box::new(move |change| {
            let _ = tx.send(change);
        }))?;
        Ok((subscription, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fresh_cache() -> &'static ParseCache {
        Box::leak(Box::new(ParseCache::new()))
    }

    fn workspace(config: &str, docs: &[(&str, &str)]) -> (TempDir, Workspace) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(config_io::CONFIG_FILE), config).unwrap();
        for (path, text) in docs {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, text).unwrap();
        }
        let ws = Workspace::load(tmp.path(), fresh_cache()).unwrap();
        (tmp, ws)
    }

    #[test]
    fn test_scan_groups_documents() {
        let (_tmp, ws) = workspace(
            "[[rules]]\ngroup = \"Work\"\npattern = \"^Proj/\"\n",
            &[("Proj/x.md", "- [ ] a\n"), ("notes.md", "- [ ] b\n")],
        );
        let grouping = ws.scan().unwrap();
        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.groups[0].name, "Work");
        assert_eq!(grouping.groups[0].files[0].path, "Proj/x.md");
    }

    #[test]
    fn test_locate_and_move() {
        let (_tmp, ws) = workspace(
            "[[rules]]\npattern = \".\"\n",
            &[("a.md", "- [ ] one\n- [ ] two\n")],
        );
        let two = ws.locate(&Locator { path: "a.md".into(), line_index: 1 }).unwrap();
        let one = ws.locate(&Locator { path: "a.md".into(), line_index: 0 }).unwrap();
        ws.relocator().move_as_first_child(&two, &one).unwrap();

        let text = fs::read_to_string(ws.root().join("a.md")).unwrap();
        assert_eq!(text, "- [ ] one\n  - [ ] two\n");
        assert!(!ws.squelch().is_active());
    }

    #[test]
    fn test_handle_change_suppressed_while_squelched() {
        let (_tmp, ws) = workspace("", &[("a.md", "- [ ] a\n")]);
        ws.parse("a.md").unwrap();

        let change = DocumentChange::new("a.md", ChangeKind::Modified);
        {
            let _guard = ws.squelch().hold();
            assert_eq!(ws.handle_change(&change), ChangeOutcome::Suppressed);
        }
        assert!(ws.cache().contains("a.md"));

        assert_eq!(ws.handle_change(&change), ChangeOutcome::Rescan);
        assert!(!ws.cache().contains("a.md"));
    }

    #[test]
    fn test_rename_invalidates_both_paths() {
        let (_tmp, ws) = workspace("", &[("a.md", "- [ ] a\n"), ("b.md", "- [ ] b\n")]);
        ws.parse("a.md").unwrap();
        ws.parse("b.md").unwrap();

        ws.handle_change(&DocumentChange::renamed("a.md", "b.md"));
        assert!(ws.cache().is_empty());
    }

    #[test]
    fn test_locate_missing_task() {
        let (_tmp, ws) = workspace("", &[("a.md", "# heading\n")]);
        let err = ws
            .locate(&Locator { path: "a.md".into(), line_index: 0 })
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Locate(LocateError::NoTask { .. })));
    }

    #[test]
    fn test_open_without_config_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Workspace::open(tmp.path()),
            Err(WorkspaceError::Config(ConfigError::NotFound))
        ));
    }
}
