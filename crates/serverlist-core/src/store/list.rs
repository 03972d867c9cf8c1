// ── Known server set ──
//
// Insertion-ordered map keyed by uid. Order is preserved across runs so the
// written file diffs cleanly.

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::model::Server;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
}

#[derive(Debug, Clone)]
pub struct ServerList<T> {
    servers: IndexMap<String, T>,
}

impl<T> Default for ServerList<T> {
    fn default() -> Self {
        Self {
            servers: IndexMap::new(),
        }
    }
}

impl<T: Server> ServerList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&T> {
        self.servers.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut T> {
        self.servers.get_mut(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.servers.contains_key(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.servers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.servers.values_mut()
    }

    /// Snapshot of all uids, in list order.
    pub fn uids(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Remove a server, keeping the order of the rest.
    pub fn remove(&mut self, uid: &str) -> Option<T> {
        self.servers.shift_remove(uid)
    }

    /// Insert without merging. A record with a uid already present replaces
    /// the existing one in place.
    pub fn insert(&mut self, server: T) {
        self.servers.insert(server.uid().to_owned(), server);
    }

    /// Merge freshly observed servers into the known set.
    ///
    /// Known uids are updated and then trimmed of stale links/via entries;
    /// unknown uids are appended verbatim. Nothing is ever removed here.
    pub fn reconcile(
        &mut self,
        found: impl IntoIterator<Item = T>,
        ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        for server in found {
            if let Some(known) = self.servers.get_mut(server.uid()) {
                trace!(uid = %server.uid(), "updating known server");
                known.update(server);
                known.trim(ttl, now);
                summary.updated += 1;
            } else {
                trace!(uid = %server.uid(), "adding new server");
                self.servers.insert(server.uid().to_owned(), server);
                summary.added += 1;
            }
        }
        summary
    }
}

impl<T: Server> FromIterator<T> for ServerList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for server in iter {
            list.insert(server);
        }
        list
    }
}

impl<T: Serialize> Serialize for ServerList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.servers.values())
    }
}
