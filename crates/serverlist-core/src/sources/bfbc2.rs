// ── Battlefield: Bad Company 2 (Project Rome FESL) ──

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serverlist_api::http::FeslClient;
use serverlist_api::tools::GamedigResponse;
use tracing::{info, warn};

use super::{FETCH_ATTEMPTS, PLATFORM, checked_address, retry};
use crate::error::CoreError;
use crate::model::{FrostbiteServer, guid_from_ip_port};
use crate::source::{PortValidator, ProbeOutcome, QueryPortSource, Source};
use crate::store::ServerList;

pub const GAME: &str = "bfbc2";

pub struct Bfbc2Source {
    client: FeslClient,
}

impl Bfbc2Source {
    pub fn new(client: FeslClient) -> Self {
        Self { client }
    }
}

impl Source for Bfbc2Source {
    type Server = FrostbiteServer;

    fn name(&self) -> &str {
        "fesl"
    }

    async fn fetch_candidates(&self) -> Result<Vec<FrostbiteServer>, CoreError> {
        info!(platform = PLATFORM, "fetching server list from Project Rome API");
        let entries = retry(self.name(), FETCH_ATTEMPTS, |_| self.client.list_servers()).await?;

        let servers = entries
            .into_iter()
            .filter_map(|entry| {
                let (ip, port) = checked_address(&entry.ip, entry.port)?;
                Some(
                    FrostbiteServer::new(guid_from_ip_port(ip, port), entry.name, entry.ip, port, Vec::new())
                        .with_fesl_ids(entry.lid, entry.gid),
                )
            })
            .collect();
        Ok(servers)
    }

    async fn check_existence(&self, server: &FrostbiteServer) -> ProbeOutcome {
        let (Some(lid), Some(gid)) = (server.lid, server.gid) else {
            warn!(uid = %server.guid, "server has no FESL ids, treating it as gone");
            return ProbeOutcome::NotFound;
        };
        match self.client.server_exists(lid, gid).await {
            Ok(true) => ProbeOutcome::Found,
            Ok(false) => ProbeOutcome::NotFound,
            Err(e) => {
                warn!(uid = %server.guid, error = %e, "failed to fetch server for expiration check");
                ProbeOutcome::Failed
            }
        }
    }
}

impl QueryPortSource for Bfbc2Source {
    fn gamedig_type(&self) -> &str {
        GAME
    }

    /// Most servers are community hosted with fairly random query ports,
    /// so the list is long and leans on the validator.
    fn port_candidates(&self, game_port: u16) -> Vec<i64> {
        let gp = i64::from(game_port);
        let mut rng = rand::thread_rng();
        vec![
            48888,      // default query port
            gp + 29321, // default offset
            gp,
            gp + 100, // nitrado
            gp + 10,
            gp + 5,
            gp + 1,
            gp + 29233, // i3D
            gp + 29000,
            gp + 29323,
            rng.gen_range(48880..=48890),
            rng.gen_range(48601..=48605),
            rng.gen_range(19567..=48888),
            rng.gen_range(gp..=gp + 29321),
        ]
    }

    fn port_validator(&self, known: &ServerList<FrostbiteServer>) -> PortValidator {
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for server in known.iter() {
            *name_counts.entry(server.name.clone()).or_default() += 1;
        }

        Arc::new(move |server: &FrostbiteServer, response: &GamedigResponse| {
            let suffix = format!(":{}", server.game_port);
            if response.connect().is_some_and(|c| c.ends_with(&suffix)) {
                return true;
            }
            response.name() == Some(server.name.as_str()) && name_counts.get(&server.name) == Some(&1)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use serverlist_api::{HttpClient, TransportConfig};

    fn source(server: &MockServer) -> Bfbc2Source {
        let http = HttpClient::new(&TransportConfig::default()).unwrap();
        Bfbc2Source::new(FeslClient::new(http, Url::parse(&server.uri()).unwrap()))
    }

    fn echo(value: serde_json::Value) -> GamedigResponse {
        GamedigResponse::from_map(value.as_object().unwrap().clone())
    }

    #[tokio::test]
    async fn fetch_derives_uid_and_keeps_fesl_ids() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "I": "81.169.230.12", "P": 19567, "N": "Rush 24/7", "LID": 257, "GID": 4711 },
                { "I": "192.168.0.10", "P": 19567, "N": "LAN", "LID": 257, "GID": 4712 }
            ])))
            .mount(&upstream)
            .await;

        let servers = source(&upstream).fetch_candidates().await.unwrap();
        assert_eq!(servers.len(), 1);
        let server = &servers[0];
        assert_eq!(server.guid, guid_from_ip_port("81.169.230.12".parse().unwrap(), 19567));
        assert_eq!((server.lid, server.gid), (Some(257), Some(4711)));
        assert_eq!(server.game_port, 19567);
    }

    #[tokio::test]
    async fn fetch_exhaustion_is_fatal() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&upstream)
            .await;

        let result = source(&upstream).fetch_candidates().await;
        assert!(matches!(result, Err(CoreError::Exhausted { attempts: 3, .. })));
    }

    #[tokio::test]
    async fn probe_needs_fesl_ids() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/257/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/257/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;

        let source = source(&upstream);
        let base = FrostbiteServer::new("g", "n", "81.169.230.12", 19567, vec![]);

        assert_eq!(source.check_existence(&base).await, ProbeOutcome::NotFound);
        let alive = base.clone().with_fesl_ids(257, 1);
        assert_eq!(source.check_existence(&alive).await, ProbeOutcome::Found);
        let flaky = base.with_fesl_ids(257, 2);
        assert_eq!(source.check_existence(&flaky).await, ProbeOutcome::Failed);
    }

    #[tokio::test]
    async fn validator_accepts_port_suffix_or_unique_name() {
        let upstream = MockServer::start().await;
        let mut known = ServerList::new();
        known.insert(FrostbiteServer::new("a", "Unique", "1.1.1.1", 19567, vec![]));
        known.insert(FrostbiteServer::new("b", "Twin", "2.2.2.2", 19567, vec![]));
        known.insert(FrostbiteServer::new("c", "Twin", "3.3.3.3", 19567, vec![]));
        let validator = source(&upstream).port_validator(&known);

        let unique = known.get("a").unwrap();
        let twin = known.get("b").unwrap();
        assert!(validator(unique, &echo(json!({ "connect": "0.0.0.0:19567" }))));
        assert!(validator(unique, &echo(json!({ "name": "Unique" }))));
        assert!(!validator(twin, &echo(json!({ "name": "Twin" }))));
        assert!(!validator(twin, &echo(json!({ "connect": "2.2.2.2:19568" }))));
    }

    #[tokio::test]
    async fn candidates_lead_with_default_query_port() {
        let upstream = MockServer::start().await;
        let ports = source(&upstream).port_candidates(19567);
        assert_eq!(&ports[..3], &[48888, 48888, 19567]);
        assert_eq!(ports.len(), 14);
        assert!((19567..=48888).contains(&ports[13]));
    }
}
