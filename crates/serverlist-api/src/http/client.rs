// Shared HTTP client for browse APIs
//
// Wraps `reqwest::Client` with status classification and JSON decoding
// that keeps a body preview around for debugging. Each upstream (Battlelog,
// gametools, FESL, mohaaservers) is a thin typed wrapper over this.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client shared by all browse API wrappers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
}

/// Outcome of a lookup against an endpoint that signals absence via status.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl HttpClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Send a GET request and return the response, whatever its status.
    pub(crate) async fn get(&self, url: Url) -> Result<reqwest::Response, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        trace!(status = %resp.status(), "response received");
        Ok(resp)
    }

    /// GET and decode a JSON body, failing on any non-2xx status.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let resp = self.get(url.clone()).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        decode_json(resp).await
    }

    /// GET a plain text body, failing on any non-2xx status.
    pub(crate) async fn get_text(&self, url: Url) -> Result<String, Error> {
        let resp = self.get(url.clone()).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        Ok(resp.text().await?)
    }

    /// GET a JSON document where `not_found` marks a definitive absence.
    ///
    /// Any other non-2xx status is an error so callers can tell "the server
    /// is gone" apart from "the upstream could not answer".
    pub(crate) async fn lookup_json<T: DeserializeOwned>(
        &self,
        url: Url,
        not_found: StatusCode,
    ) -> Result<Lookup<T>, Error> {
        let resp = self.get(url.clone()).await?;
        let status = resp.status();
        if status == not_found {
            return Ok(Lookup::NotFound);
        }
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        decode_json(resp).await.map(Lookup::Found)
    }
}

fn status_error(status: StatusCode, url: &Url) -> Error {
    Error::Status {
        status: status.as_u16(),
        url: url.to_string(),
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Join a relative path onto a base URL, keeping the base's own path.
pub(crate) fn join(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
}
