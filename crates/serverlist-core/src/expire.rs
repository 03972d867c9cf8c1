// ── Expiry sweep ──
//
// Removes servers not seen within the TTL. With recovery enabled each
// expired server is probed first; only a probe that completes and reports
// the server gone removes it.

use chrono::{TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::model::Server;
use crate::source::{ProbeOutcome, Source};
use crate::store::ServerList;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpireSummary {
    pub removed: usize,
    pub recovered: usize,
}

pub async fn remove_expired<S: Source>(
    list: &mut ServerList<S::Server>,
    source: &S,
    ttl: TimeDelta,
    recover: bool,
) -> ExpireSummary {
    info!(servers = list.len(), "checking expiration ttl");
    let mut summary = ExpireSummary::default();
    // consecutive probes that could not complete
    let mut failures = 0u32;

    for uid in list.uids() {
        let Some(server) = list.get(&uid) else {
            continue;
        };
        if !server.is_expired(ttl, Utc::now()) {
            continue;
        }

        if !recover {
            debug!(%uid, "server expired, removing");
            list.remove(&uid);
            summary.removed += 1;
            continue;
        }

        tokio::time::sleep(source.backoff(failures)).await;
        match source.check_existence(server).await {
            ProbeOutcome::Failed => {
                failures += 1;
                warn!(%uid, failures, "expiration check failed, keeping server");
            }
            ProbeOutcome::Found => {
                failures = 0;
                debug!(%uid, "server missing from list but still online");
                if let Some(server) = list.get_mut(&uid) {
                    let now = Utc::now();
                    server.touch(now);
                    server.trim(ttl, now);
                }
                summary.recovered += 1;
            }
            ProbeOutcome::NotFound => {
                failures = 0;
                debug!(%uid, "server could not be recovered, removing");
                list.remove(&uid);
                summary.removed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::CoreError;
    use crate::model::{GametoolsServer, WebLink};

    /// Answers probes from a script and records the backoff it was asked for.
    pub(crate) struct FakeSource {
        pub(crate) outcomes: Mutex<VecDeque<ProbeOutcome>>,
        pub(crate) backoffs: Mutex<Vec<u32>>,
        pub(crate) candidates: Vec<GametoolsServer>,
    }

    impl FakeSource {
        pub(crate) fn new(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                backoffs: Mutex::new(Vec::new()),
                candidates: Vec::new(),
            }
        }
    }

    impl Source for FakeSource {
        type Server = GametoolsServer;

        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_candidates(&self) -> Result<Vec<GametoolsServer>, CoreError> {
            Ok(self.candidates.clone())
        }

        async fn check_existence(&self, _server: &GametoolsServer) -> ProbeOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ProbeOutcome::Failed)
        }

        fn backoff(&self, failures: u32) -> Duration {
            self.backoffs.lock().unwrap().push(failures);
            Duration::from_secs(u64::from(failures))
        }
    }

    pub(crate) fn stale(id: &str, hours: i64) -> GametoolsServer {
        let mut server = GametoolsServer::new(id, id, vec![]);
        server.last_seen_at = Utc::now() - TimeDelta::hours(hours);
        server
    }

    #[tokio::test(start_paused = true)]
    async fn removes_without_probing_when_recovery_disabled() {
        let mut list: ServerList<_> = [stale("old", 24), stale("fresh", 1)].into_iter().collect();
        let source = FakeSource::new([]);

        let summary = remove_expired(&mut list, &source, TimeDelta::hours(12), false).await;

        assert_eq!(summary, ExpireSummary { removed: 1, recovered: 0 });
        assert_eq!(list.uids(), ["fresh"]);
        assert!(source.backoffs.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn found_probe_recovers_server() {
        let mut old = stale("old", 24);
        let mut link = WebLink::new("gametools.network", "https://x", false);
        link.as_of = Utc::now() - TimeDelta::hours(24);
        old.links.push(link);
        let mut list: ServerList<_> = [old].into_iter().collect();
        let source = FakeSource::new([ProbeOutcome::Found]);

        let summary = remove_expired(&mut list, &source, TimeDelta::hours(12), true).await;

        assert_eq!(summary, ExpireSummary { removed: 0, recovered: 1 });
        let server = list.get("old").unwrap();
        assert!(!server.is_expired(TimeDelta::hours(12), Utc::now()));
        assert!(server.links.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_probe_removes_server() {
        let mut list: ServerList<_> = [stale("old", 24)].into_iter().collect();
        let source = FakeSource::new([ProbeOutcome::NotFound]);

        let summary = remove_expired(&mut list, &source, TimeDelta::hours(12), true).await;

        assert_eq!(summary, ExpireSummary { removed: 1, recovered: 0 });
        assert!(list.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probes_fail_open_and_grow_backoff() {
        let servers = [stale("a", 24), stale("b", 24), stale("c", 24), stale("d", 24)];
        let before = servers.clone();
        let mut list: ServerList<_> = servers.into_iter().collect();
        let source = FakeSource::new([
            ProbeOutcome::Failed,
            ProbeOutcome::Failed,
            ProbeOutcome::Failed,
            ProbeOutcome::NotFound,
        ]);

        let summary = remove_expired(&mut list, &source, TimeDelta::hours(12), true).await;

        assert_eq!(summary, ExpireSummary { removed: 1, recovered: 0 });
        for server in &before[..3] {
            assert_eq!(list.get(&server.game_id), Some(server));
        }
        assert!(list.get("d").is_none());
        assert_eq!(*source.backoffs.lock().unwrap(), [0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_counter() {
        let mut list: ServerList<_> = [stale("a", 24), stale("b", 24), stale("c", 24)]
            .into_iter()
            .collect();
        let source = FakeSource::new([ProbeOutcome::Failed, ProbeOutcome::Found, ProbeOutcome::Failed]);

        remove_expired(&mut list, &source, TimeDelta::hours(12), true).await;

        assert_eq!(*source.backoffs.lock().unwrap(), [0, 1, 0]);
        assert_eq!(list.len(), 3);
    }
}
