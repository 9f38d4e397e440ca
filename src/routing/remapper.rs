//! Live path-prefix remapping.
//!
//! # Responsibilities
//! - Hold the current prefix → replacement table
//! - Rewrite inbound request targets before any other processing
//! - Reject unmapped requests in exclusive mode
//!
//! # Design Decisions
//! - The table is immutable; updates swap in a whole new `Arc`
//! - Readers take a snapshot and keep it for the rest of the request
//! - Longest keys are tried first so a more specific prefix wins

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Uri;
use thiserror::Error;

/// Immutable mapping from path-prefix token to replacement token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMappingTable {
    entries: Vec<(String, String)>,
}

impl RouteMappingTable {
    pub fn new(mapping: HashMap<String, String>) -> Self {
        let mut entries: Vec<_> = mapping.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Rewrite `target` with the first entry whose `/key` prefixes it.
    ///
    /// Returns `None` when no entry matches. A matching entry replaces the
    /// first `/key/` segment with `/value/`; scanning stops at that entry
    /// even when the target has no such segment.
    pub fn rewrite(&self, target: &str) -> Option<String> {
        self.entries.iter().find_map(|(key, value)| {
            if target.starts_with(&format!("/{}", key)) {
                Some(target.replacen(&format!("/{}/", key), &format!("/{}/", value), 1))
            } else {
                None
            }
        })
    }
}

impl FromIterator<(String, String)> for RouteMappingTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Failure to remap a request target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemapError {
    /// Exclusive mode and no entry matched.
    #[error("no route mapping matches {target}")]
    NotFound { target: String },

    /// The rewritten target is not a valid request URI.
    #[error("rewritten request target {target:?} is invalid")]
    InvalidTarget { target: String },
}

/// Shared holder of the current [`RouteMappingTable`].
#[derive(Debug)]
pub struct RouteRemapper {
    table: ArcSwap<RouteMappingTable>,
    exclusive: bool,
}

impl RouteRemapper {
    /// Create a remapper with an empty table.
    pub fn new(exclusive: bool) -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteMappingTable::default()),
            exclusive,
        }
    }

    /// Replace the whole table. Snapshots already handed out are unaffected.
    pub fn set(&self, table: RouteMappingTable) {
        self.table.store(Arc::new(table));
    }

    /// The current table.
    pub fn snapshot(&self) -> Arc<RouteMappingTable> {
        self.table.load_full()
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Apply the current table to an inbound request URI.
    pub fn remap(&self, uri: &Uri) -> Result<Uri, RemapError> {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());

        let table = self.snapshot();
        match table.rewrite(target) {
            Some(rewritten) => {
                if rewritten != target {
                    tracing::debug!(from = %target, to = %rewritten, "Remapped request target");
                }
                rewritten
                    .parse()
                    .map_err(|_| RemapError::InvalidTarget { target: rewritten })
            }
            None if self.exclusive => Err(RemapError::NotFound {
                target: target.to_string(),
            }),
            None => Ok(uri.clone()),
        }
    }
}
