// ── Via status ──
//
// Which principal reported a server, and when. A server listed by several
// principals carries one entry per principal, each expiring on its own.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::time;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViaStatus {
    pub principal: String,
    #[serde(serialize_with = "time::serialize", deserialize_with = "time::deserialize")]
    pub first_seen_at: DateTime<Utc>,
    #[serde(serialize_with = "time::serialize", deserialize_with = "time::deserialize")]
    pub last_seen_at: DateTime<Utc>,
}

impl ViaStatus {
    pub fn new(principal: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            principal: principal.into(),
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    pub fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        time::is_expired(self.last_seen_at, ttl, now)
    }
}

/// Upsert by principal. Only `last_seen_at` advances on an existing entry.
pub fn merge_via(via: &mut Vec<ViaStatus>, incoming: impl IntoIterator<Item = ViaStatus>) {
    for status in incoming {
        match via.iter_mut().find(|v| v.principal == status.principal) {
            Some(existing) => existing.last_seen_at = status.last_seen_at,
            None => via.push(status),
        }
    }
}
