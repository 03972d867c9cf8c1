// Project Rome FESL API (Battlefield: Bad Company 2)

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use tracing::debug;
use url::Url;

use super::client::{HttpClient, join};
use crate::error::Error;

pub const FESL_BASE_URL: &str = "https://fesl.cetteup.com/v1/bfbc2/servers/rome-pc";

/// A server entry as published by the theater backend.
#[derive(Debug, Clone, Deserialize)]
pub struct FeslServer {
    #[serde(rename = "I")]
    pub ip: String,
    #[serde(rename = "P", deserialize_with = "number_or_string")]
    pub port: i64,
    #[serde(rename = "N")]
    pub name: String,
    #[serde(rename = "LID", deserialize_with = "number_or_string")]
    pub lid: i64,
    #[serde(rename = "GID", deserialize_with = "number_or_string")]
    pub gid: i64,
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub struct FeslClient {
    http: HttpClient,
    base_url: Url,
}

impl FeslClient {
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub async fn list_servers(&self) -> Result<Vec<FeslServer>, Error> {
        debug!(url = %self.base_url, "fetching theater server list");
        self.http.get_json(self.base_url.clone()).await
    }

    /// `true` on 2xx, `false` on 404, error on anything else.
    pub async fn server_exists(&self, lid: i64, gid: i64) -> Result<bool, Error> {
        let url = join(&self.base_url, &format!("{lid}/{gid}"))?;
        let resp = self.http.get(url.clone()).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}
