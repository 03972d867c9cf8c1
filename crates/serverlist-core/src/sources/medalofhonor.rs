// ── Medal of Honor via mohaaservers.tk ──
//
// The community principal speaks a GameSpy dialect gslist cannot handle,
// but it also publishes plain text lists. Those only carry the game port,
// which MOH servers also answer Quake3-style status queries on.

use std::time::Duration;

use serverlist_api::http::MohaaServersClient;
use serverlist_api::principal::quake3::{self, StatusDialect};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info, warn};

use super::{FETCH_ATTEMPTS, checked_address, classic_server, retry};
use crate::error::CoreError;
use crate::model::ClassicServer;
use crate::source::{ProbeOutcome, Source};

pub const PRINCIPAL: &str = "mohaaservers.tk";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, IntoStaticStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum MedalOfHonorGame {
    Mohaa,
    Mohbt,
    Mohpa,
    Mohsh,
}

impl MedalOfHonorGame {
    /// List key: the game name without its `moh` prefix.
    pub fn list_key(self) -> &'static str {
        let name: &'static str = self.into();
        name.strip_prefix("moh").unwrap_or(name)
    }
}

pub struct MedalOfHonorSource {
    client: MohaaServersClient,
    game: MedalOfHonorGame,
    timeout: Duration,
}

impl MedalOfHonorSource {
    pub fn new(client: MohaaServersClient, game: MedalOfHonorGame, timeout: Duration) -> Self {
        Self { client, game, timeout }
    }
}

/// Parse `ip:port` lines. Blank lines are skipped silently, anything else
/// unusable with a warning.
pub fn parse_list(raw: &str) -> Vec<ClassicServer> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let Some((ip, port)) = line.split_once(':') else {
                warn!(line, "principal returned malformed server list entry, skipping it");
                return None;
            };
            let Ok(port) = port.parse::<i64>() else {
                warn!(line, "principal returned malformed server list entry, skipping it");
                return None;
            };
            let (ip, port) = checked_address(ip, port)?;
            Some(classic_server(ip, port, PRINCIPAL, Vec::new()))
        })
        .collect()
}

impl Source for MedalOfHonorSource {
    type Server = ClassicServer;

    fn name(&self) -> &str {
        PRINCIPAL
    }

    async fn fetch_candidates(&self) -> Result<Vec<ClassicServer>, CoreError> {
        info!(game = %self.game, "fetching server list from {PRINCIPAL}");
        let key = self.game.list_key();
        let raw = retry(PRINCIPAL, FETCH_ATTEMPTS, |_| self.client.list(key)).await?;
        Ok(parse_list(&raw))
    }

    async fn check_existence(&self, server: &ClassicServer) -> ProbeOutcome {
        let Some(port) = server.query_port.get() else {
            return ProbeOutcome::NotFound;
        };
        match quake3::get_status(&server.ip, port, StatusDialect::MedalOfHonor, self.timeout).await {
            Ok(_) => ProbeOutcome::Found,
            Err(e) => {
                debug!(uid = %server.guid, error = %e, "failed to query server for expiration check");
                ProbeOutcome::NotFound
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::guid_from_ip_port;
    use serverlist_api::{HttpClient, TransportConfig};

    fn source(server: &MockServer, game: MedalOfHonorGame) -> MedalOfHonorSource {
        let http = HttpClient::new(&TransportConfig::default()).unwrap();
        let client = MohaaServersClient::new(http, Url::parse(&server.uri()).unwrap());
        MedalOfHonorSource::new(client, game, Duration::from_secs(1))
    }

    #[test]
    fn list_keys_drop_prefix() {
        assert_eq!(MedalOfHonorGame::Mohaa.list_key(), "aa");
        assert_eq!(MedalOfHonorGame::Mohsh.list_key(), "sh");
    }

    #[test]
    fn parse_skips_bad_lines() {
        let raw = "  81.169.230.12:12203  \n\n1.2.3.4\n81.169.230.13:abc\n10.0.0.1:12203\n81.169.230.14:12300\n";
        let servers = parse_list(raw);
        let addresses: Vec<_> = servers
            .iter()
            .map(|s| (s.ip.as_str(), s.query_port.get()))
            .collect();
        assert_eq!(
            addresses,
            [("81.169.230.12", Some(12203)), ("81.169.230.14", Some(12300))]
        );
        assert_eq!(servers[0].via[0].principal, PRINCIPAL);
        assert_eq!(
            servers[0].guid,
            guid_from_ip_port("81.169.230.12".parse().unwrap(), 12203)
        );
    }

    #[tokio::test]
    async fn fetch_uses_game_key() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers_bt.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("81.169.230.12:12203\n"))
            .mount(&upstream)
            .await;

        let servers = source(&upstream, MedalOfHonorGame::Mohbt)
            .fetch_candidates()
            .await
            .unwrap();
        assert_eq!(servers.len(), 1);
    }

    #[tokio::test]
    async fn fetch_exhaustion_is_fatal() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&upstream)
            .await;

        let result = source(&upstream, MedalOfHonorGame::Mohaa).fetch_candidates().await;
        assert!(matches!(result, Err(CoreError::Exhausted { attempts: 3, .. })));
    }

    #[tokio::test]
    async fn unreachable_server_is_gone() {
        let upstream = MockServer::start().await;
        // Bound but silent, so the status query times out
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let server = ClassicServer::new("g", "127.0.0.1", port, PRINCIPAL, vec![]);

        let outcome = source(&upstream, MedalOfHonorGame::Mohaa).check_existence(&server).await;
        assert_eq!(outcome, ProbeOutcome::NotFound);
        drop(socket);
    }
}
