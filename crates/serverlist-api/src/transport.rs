// Shared transport configuration for building reqwest::Client instances.
//
// Every HTTP source client shares timeout, proxy and header settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("serverlist/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Proxy for https requests (every upstream is https-only).
    pub proxy: Option<Url>,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            proxy: None,
            headers: Vec::new(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::protocol(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::protocol(format!("invalid header value {value:?}: {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if let Some(ref proxy) = self.proxy {
            builder = builder.proxy(reqwest::Proxy::https(proxy.as_str())?);
        }

        Ok(builder.build()?)
    }

    /// Add a default header to every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_proxy(mut self, proxy: Option<Url>) -> Self {
        self.proxy = proxy;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_headers_and_proxy() {
        let config = TransportConfig::default()
            .with_header("X-Requested-With", "XMLHttpRequest")
            .with_proxy(Some(Url::parse("http://127.0.0.1:3128").unwrap()));
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn rejects_invalid_header_name() {
        let config = TransportConfig::default().with_header("bad header", "x");
        assert!(matches!(config.build_client(), Err(Error::Protocol { .. })));
    }
}
