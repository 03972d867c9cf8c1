// gametools.network server API

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::client::{HttpClient, Lookup, join};
use crate::error::Error;

pub const GAMETOOLS_BASE_URL: &str = "https://api.gametools.network";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GametoolsServer {
    pub game_id: String,
    /// Display name (gametools calls it the server prefix).
    pub prefix: String,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GametoolsPage {
    #[serde(default)]
    pub servers: Vec<GametoolsServer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GametoolsDetail {
    #[serde(default)]
    pub official: bool,
}

pub struct GametoolsClient {
    http: HttpClient,
    base_url: Url,
}

impl GametoolsClient {
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch one listing page. `nocache` defeats the upstream response cache.
    pub async fn list_servers(&self, game: &str, limit: u32) -> Result<GametoolsPage, Error> {
        let mut url = join(&self.base_url, &format!("{game}/servers/"))?;
        let nocache = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        url.query_pairs_mut()
            .append_pair("name", "")
            .append_pair("limit", &limit.to_string())
            .append_pair("nocache", &nocache.to_string());
        debug!(game, limit, "fetching gametools page");
        self.http.get_json(url).await
    }

    pub async fn server_detail(
        &self,
        game: &str,
        game_id: &str,
    ) -> Result<Lookup<GametoolsDetail>, Error> {
        let mut url = join(&self.base_url, &format!("{game}/detailedserver/"))?;
        url.query_pairs_mut().append_pair("gameid", game_id);
        self.http.lookup_json(url, StatusCode::NOT_FOUND).await
    }
}
