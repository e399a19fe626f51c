use std::collections::{BTreeMap, BTreeSet};

use crate::io::cache::ParseCache;
use crate::io::store::{DocumentStore, StoreError};
use crate::model::bucket::{FileBucket, GroupBucket, Grouping, GroupingMode};
use crate::model::document::DocumentMeta;
use crate::model::node::ChildrenIndex;
use crate::ops::rules::CompiledRule;

/// Key of the single pseudo-group produced in flat mode
pub const FLAT_GROUP_KEY: &str = "";
pub const FLAT_GROUP_NAME: &str = "All documents";

/// Bucket `documents` by the rules that match their paths.
///
/// Flat mode (no rule names a group) yields exactly one pseudo-group holding
/// every matched document. Grouped mode yields one group per distinct
/// non-empty group name, sorted by name. A document appears at most once per
/// group, is parsed at most once, and shares its parsed form across groups.
/// Documents that vanish between listing and reading are skipped.
pub fn group_documents(
    store: &dyn DocumentStore,
    cache: &ParseCache,
    documents: &[DocumentMeta],
    rules: &[CompiledRule],
) -> Result<Grouping, StoreError> {
    let mode = if rules.iter().any(CompiledRule::is_named) {
        GroupingMode::Grouped
    } else {
        GroupingMode::Flat
    };

    let mut buckets: BTreeMap<String, Vec<FileBucket>> = BTreeMap::new();
    let mut children = ChildrenIndex::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for meta in documents {
        if !seen.insert(meta.path.as_str()) {
            continue;
        }

        let matching: Vec<&CompiledRule> = rules.iter().filter(|r| r.matches(&meta.path)).collect();
        if matching.is_empty() {
            continue;
        }

        let groups: BTreeSet<&str> = match mode {
            GroupingMode::Flat => BTreeSet::from([FLAT_GROUP_KEY]),
            GroupingMode::Grouped => matching
                .iter()
                .filter(|r| r.is_named())
                .map(|r| r.group.as_str())
                .collect(),
        };
        if groups.is_empty() {
            continue;
        }

        let parsed = match cache.get_or_parse(store, meta) {
            Ok(parsed) => parsed,
            Err(StoreError::NotFound(path)) => {
                tracing::debug!(%path, "document disappeared before scan");
                continue;
            }
            Err(e) => return Err(e),
        };
        children.merge(&parsed.children);

        for group in groups {
            buckets.entry(group.to_string()).or_default().push(FileBucket {
                path: meta.path.clone(),
                display_name: meta.display_name().to_string(),
                document: parsed.clone(),
            });
        }
    }

    let mut groups: Vec<GroupBucket> = buckets
        .into_iter()
        .map(|(name, mut files)| {
            files.sort_by(|a, b| {
                a.display_name
                    .cmp(&b.display_name)
                    .then_with(|| a.path.cmp(&b.path))
            });
            GroupBucket {
                key: name.clone(),
                name,
                files,
            }
        })
        .collect();

    if mode == GroupingMode::Flat {
        let files = groups.pop().map(|g| g.files).unwrap_or_default();
        groups = vec![GroupBucket {
            key: FLAT_GROUP_KEY.to_string(),
            name: FLAT_GROUP_NAME.to_string(),
            files,
        }];
    }

    Ok(Grouping {
        mode,
        groups,
        children,
    })
}
