// ── Query port discovery ──
//
// One probe task per server, run through a fixed-width pool. All tasks are
// joined before any result is applied, so the list itself is only ever
// touched from this function's own task.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use rand::seq::SliceRandom;
use serverlist_api::tools::{Gamedig, GamedigResponse};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::model::{FrostbiteServer, QueryPort, is_valid_port, time};
use crate::source::PortValidator;
use crate::store::ServerList;

/// Number of randomly picked candidates tried besides the first one.
const RANDOM_CANDIDATES: usize = 5;

/// Something that can query a server on one specific port.
pub trait QueryTool: Send + Sync + 'static {
    fn query(
        &self,
        game_type: &str,
        ip: &str,
        port: u16,
    ) -> impl Future<Output = Result<GamedigResponse, serverlist_api::Error>> + Send;
}

impl QueryTool for Gamedig {
    fn query(
        &self,
        game_type: &str,
        ip: &str,
        port: u16,
    ) -> impl Future<Output = Result<GamedigResponse, serverlist_api::Error>> + Send {
        Gamedig::query(self, game_type, ip, port)
    }
}

/// Counters logged after a discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryPortStats {
    pub total_searches: usize,
    pub query_port_found: usize,
    pub query_port_reset: usize,
}

/// The ports to try for one server, in order.
///
/// Out-of-range candidates are dropped, the rest are cut down to the first
/// one plus a random sample, and the currently known port (if any) goes in
/// front.
pub fn select_ports(known: QueryPort, candidates: &[i64]) -> Vec<u16> {
    let valid: Vec<u16> = candidates
        .iter()
        .copied()
        .filter(|&p| is_valid_port(p))
        .filter_map(|p| u16::try_from(p).ok())
        .collect();

    let mut ports = Vec::with_capacity(RANDOM_CANDIDATES + 2);
    if let Some(port) = known.get() {
        ports.push(port);
    }
    if let Some((first, rest)) = valid.split_first() {
        ports.push(*first);
        ports.extend(rest.choose_multiple(&mut rand::thread_rng(), RANDOM_CANDIDATES).copied());
    }

    let mut seen = Vec::with_capacity(ports.len());
    ports.retain(|p| {
        let fresh = !seen.contains(p);
        seen.push(*p);
        fresh
    });
    ports
}

/// Probe `ports` in order, returning the first one whose response passes
/// `validator`.
async fn search<Q: QueryTool>(
    tool: &Q,
    game_type: &str,
    server: &FrostbiteServer,
    ports: &[u16],
    validator: &PortValidator,
) -> Option<u16> {
    for &port in ports {
        match tool.query(game_type, &server.ip, port).await {
            Ok(response) if validator(server, &response) => return Some(port),
            Ok(_) => debug!(uid = %server.guid, port, "response did not match server"),
            Err(e) => debug!(uid = %server.guid, port, error = %e, "no response"),
        }
    }
    None
}

/// Discover or refresh the query port of every server in `list`.
///
/// A server whose search fails keeps its port unless the port was last
/// confirmed more than `ttl` ago, in which case it is reset to unknown.
pub async fn find_query_ports<Q, F>(
    list: &mut ServerList<FrostbiteServer>,
    tool: Arc<Q>,
    game_type: &str,
    concurrency: usize,
    candidates: F,
    validator: &PortValidator,
    ttl: TimeDelta,
) -> QueryPortStats
where
    Q: QueryTool,
    F: Fn(u16) -> Vec<i64>,
{
    info!(servers = list.len(), "searching query ports");
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let handles: Vec<_> = list
        .iter()
        .map(|server| {
            let ports = select_ports(server.query_port, &candidates(server.game_port));
            let server = server.clone();
            let tool = Arc::clone(&tool);
            let validator = Arc::clone(validator);
            let semaphore = Arc::clone(&semaphore);
            let game_type = game_type.to_owned();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                search(tool.as_ref(), &game_type, &server, &ports, &validator).await
            })
        })
        .collect();

    let results = join_all(handles).await;

    let now = Utc::now();
    let mut stats = QueryPortStats {
        total_searches: results.len(),
        ..QueryPortStats::default()
    };
    for (server, result) in list.iter_mut().zip(results) {
        let found = result.unwrap_or_else(|e| {
            warn!(uid = %server.guid, error = %e, "query port search task failed");
            None
        });
        if apply_result(server, found, ttl, now) {
            if found.is_some() {
                stats.query_port_found += 1;
            } else {
                stats.query_port_reset += 1;
            }
        }
    }

    info!(
        total_searches = stats.total_searches,
        query_port_found = stats.query_port_found,
        query_port_reset = stats.query_port_reset,
        "query port search finished"
    );
    stats
}

/// Apply one search result. Returns `true` if the server changed.
fn apply_result(
    server: &mut FrostbiteServer,
    found: Option<u16>,
    ttl: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    if let Some(port) = found {
        debug!(uid = %server.guid, port, "query port found");
        server.query_port = QueryPort::known(port);
        server.last_queried_at = Some(now);
        return true;
    }

    let stale = server
        .last_queried_at
        .is_none_or(|queried| time::is_expired(queried, ttl, now));
    if server.query_port.is_known() && stale {
        debug!(uid = %server.guid, was = %server.query_port, "query port expired, resetting");
        server.query_port = QueryPort::UNKNOWN;
        return true;
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Map, Value};

    use super::*;

    /// Answers only on `live_port`, echoing `connect`.
    struct FakeTool {
        live_port: u16,
        connect: String,
        asked: Mutex<Vec<u16>>,
    }

    impl QueryTool for FakeTool {
        async fn query(
            &self,
            _game_type: &str,
            _ip: &str,
            port: u16,
        ) -> Result<GamedigResponse, serverlist_api::Error> {
            self.asked.lock().unwrap().push(port);
            if port == self.live_port {
                let mut map = Map::new();
                map.insert("connect".into(), Value::String(self.connect.clone()));
                Ok(GamedigResponse::from_map(map))
            } else {
                Err(serverlist_api::Error::Timeout { timeout_secs: 2 })
            }
        }
    }

    fn exact_echo() -> PortValidator {
        Arc::new(|server: &FrostbiteServer, response: &GamedigResponse| {
            response.connect() == Some(format!("{}:{}", server.ip, server.game_port).as_str())
        })
    }

    fn list_with(server: FrostbiteServer) -> ServerList<FrostbiteServer> {
        [server].into_iter().collect()
    }

    #[tokio::test]
    async fn finds_port_that_echoes_game_port() {
        let mut list = list_with(FrostbiteServer::new("a1", "Srv", "1.2.3.4", 25200, vec![]));
        let tool = Arc::new(FakeTool {
            live_port: 47300,
            connect: "1.2.3.4:25200".into(),
            asked: Mutex::new(Vec::new()),
        });

        let stats = find_query_ports(
            &mut list,
            Arc::clone(&tool),
            "bf4",
            12,
            |_| vec![47200, 47300, 25200],
            &exact_echo(),
            TimeDelta::hours(12),
        )
        .await;

        let server = list.get("a1").unwrap();
        assert_eq!(server.query_port, QueryPort::known(47300));
        assert!(server.last_queried_at.is_some());
        assert_eq!(stats.query_port_found, 1);
        assert_eq!(tool.asked.lock().unwrap()[0], 47200);
    }

    #[tokio::test]
    async fn mismatched_echo_is_rejected() {
        let mut list = list_with(FrostbiteServer::new("a1", "Srv", "1.2.3.4", 25200, vec![]));
        let tool = Arc::new(FakeTool {
            live_port: 47200,
            connect: "1.2.3.4:25201".into(),
            asked: Mutex::new(Vec::new()),
        });

        let stats = find_query_ports(
            &mut list,
            tool,
            "bf4",
            1,
            |_| vec![47200],
            &exact_echo(),
            TimeDelta::hours(12),
        )
        .await;

        assert_eq!(list.get("a1").unwrap().query_port, QueryPort::UNKNOWN);
        assert_eq!(stats, QueryPortStats { total_searches: 1, ..Default::default() });
    }

    #[test]
    fn reset_is_gated_by_last_query() {
        let ttl = TimeDelta::hours(12);
        let now = Utc::now();
        let mut server = FrostbiteServer::new("a1", "Srv", "1.2.3.4", 25200, vec![]);
        server.query_port = QueryPort::known(47200);

        server.last_queried_at = Some(now - TimeDelta::hours(1));
        assert!(!apply_result(&mut server, None, ttl, now));
        assert_eq!(server.query_port, QueryPort::known(47200));

        server.last_queried_at = Some(now - TimeDelta::hours(13));
        assert!(apply_result(&mut server, None, ttl, now));
        assert_eq!(server.query_port, QueryPort::UNKNOWN);
        // never reset to null
        assert!(server.last_queried_at.is_some());
    }

    #[test]
    fn unknown_port_without_result_is_untouched() {
        let mut server = FrostbiteServer::new("a1", "Srv", "1.2.3.4", 25200, vec![]);
        assert!(!apply_result(&mut server, None, TimeDelta::hours(12), Utc::now()));
    }

    #[test]
    fn known_port_goes_first_and_ports_are_unique() {
        let ports = select_ports(QueryPort::known(47200), &[47200, -5, 70000, 25200, 25200]);
        assert_eq!(ports[0], 47200);
        assert!(ports.contains(&25200));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn sample_is_bounded() {
        let candidates: Vec<i64> = (1..=40).collect();
        let ports = select_ports(QueryPort::UNKNOWN, &candidates);
        assert_eq!(ports.len(), 1 + RANDOM_CANDIDATES);
        assert_eq!(ports[0], 1);
        assert!(select_ports(QueryPort::UNKNOWN, &[]).is_empty());
    }
}
