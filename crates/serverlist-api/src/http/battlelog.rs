// Battlelog browse API
//
// The server browser endpoint ignores `offset`, so every call returns a
// near-random subset of all servers. Paging is driven by the caller.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::client::{HttpClient, Lookup, join};
use crate::error::Error;

pub const BATTLELOG_BASE_URL: &str = "https://battlelog.battlefield.com";

/// One server entry from a browse page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlelogServer {
    pub guid: String,
    pub name: String,
    /// Empty for private servers.
    #[serde(default)]
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub game_id: Option<serde_json::Value>,
}

impl BattlelogServer {
    /// The numeric game id as a string, if present.
    pub fn game_id(&self) -> Option<String> {
        match self.game_id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BattlelogPage {
    #[serde(default)]
    pub data: Vec<BattlelogServer>,
}

#[derive(Debug, Clone, Deserialize)]
struct ShowResponse {
    message: ShowMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ShowMessage {
    #[serde(rename = "SERVER_INFO")]
    server_info: ServerInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerInfo {
    #[serde(default)]
    ip: String,
}

/// Typed client for the Battlelog server browser.
pub struct BattlelogClient {
    http: HttpClient,
    base_url: Url,
}

impl BattlelogClient {
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch one browse page.
    ///
    /// BF3 uses the auto-browse endpoint, later titles `getServers`.
    pub async fn list_servers(
        &self,
        game: &str,
        platform: &str,
        per_page: u32,
    ) -> Result<BattlelogPage, Error> {
        let endpoint = if game == "bf3" {
            "getAutoBrowseServers"
        } else {
            "getServers"
        };
        let mut url = join(
            &self.base_url,
            &format!("{game}/servers/{endpoint}/{platform}/"),
        )?;
        url.query_pairs_mut()
            .append_pair("count", &per_page.to_string())
            .append_pair("offset", "0");
        debug!(game, platform, per_page, "fetching battlelog page");
        self.http.get_json(url).await
    }

    /// Look up a single server's detail page.
    ///
    /// `Found(true)` when the server is listed and public, `Found(false)` when
    /// it is listed without an address, `NotFound` on Battlelog's 422.
    pub async fn server_is_public(
        &self,
        game: &str,
        platform: &str,
        uid: &str,
    ) -> Result<Lookup<bool>, Error> {
        let mut url = join(
            &self.base_url,
            &format!("{game}/servers/show/{platform}/{uid}"),
        )?;
        url.query_pairs_mut().append_pair("json", "1");
        let lookup: Lookup<ShowResponse> = self
            .http
            .lookup_json(url, StatusCode::UNPROCESSABLE_ENTITY)
            .await?;
        Ok(match lookup {
            Lookup::Found(resp) => Lookup::Found(!resp.message.server_info.ip.is_empty()),
            Lookup::NotFound => Lookup::NotFound,
        })
    }
}
