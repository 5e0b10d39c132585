//! Final listing assembly
//!
//! Streams the index, keeps entries under the tree root, rebases them to
//! relative paths, decodes residual character entities, applies the
//! embedding's filter, and re-adds ancestor directories the filter
//! dropped but included files still imply. Re-added ancestors keep the
//! metadata the index holds for them; a zeroed stat is only synthesized
//! for ancestors the index does not know at all.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::StatModel;
use crate::error::SyncResult;
use crate::infrastructure::index_store::FileIndexStore;
use crate::shared::paths;

use super::filter::PathFilter;

pub(crate) async fn build_listing(
    store: &FileIndexStore,
    base_dir: &str,
    filter: &dyn PathFilter,
) -> SyncResult<Vec<StatModel>> {
    let mut included = Vec::new();
    let mut known_dirs: HashMap<String, StatModel> = HashMap::new();
    store
        .iterate_all(|entry| {
            if let Some(relative) = paths::relative_to(&entry.path, base_dir) {
                // The tree root itself is not part of its own listing
                if !relative.is_empty() {
                    let relative = paths::decode_entities(relative);
                    let mut stat = entry.to_stat();
                    stat.basename = paths::basename(&relative).to_string();
                    stat.path = relative.clone();
                    // Remember every directory, filtered out or not, so
                    // ancestor completion can restore real metadata
                    if stat.is_dir {
                        known_dirs.insert(relative.clone(), stat.clone());
                    }
                    if filter.include(&relative) {
                        included.push(stat);
                    }
                }
            }
            true
        })
        .await?;

    complete_missing_dirs(&mut included, &known_dirs);
    included.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(included)
}

/// Re-add ancestor directories implied by included entries but absent
/// from the filtered set, so the listing always forms a connected tree.
/// Ancestors found in `known_dirs` carry their indexed metadata.
pub(crate) fn complete_missing_dirs(
    entries: &mut Vec<StatModel>,
    known_dirs: &HashMap<String, StatModel>,
) {
    let present: HashSet<String> = entries.iter().map(|e| e.path.clone()).collect();
    let mut missing: BTreeMap<String, StatModel> = BTreeMap::new();

    for entry in entries.iter() {
        for (idx, _) in entry.path.match_indices('/') {
            let ancestor = &entry.path[..idx];
            if !ancestor.is_empty()
                && !present.contains(ancestor)
                && !missing.contains_key(ancestor)
            {
                let stat = known_dirs.get(ancestor).cloned().unwrap_or_else(|| StatModel {
                    path: ancestor.to_string(),
                    basename: paths::basename(ancestor).to_string(),
                    is_dir: true,
                    is_deleted: false,
                    mtime_ms: 0,
                    size: 0,
                });
                missing.insert(ancestor.to_string(), stat);
            }
        }
    }

    entries.extend(missing.into_values());
}
