use thiserror::Error;

/// Top-level error type for the `serverlist-api` crate.
///
/// Covers every way of talking to the outside world: HTTP browse APIs,
/// external tools run as subprocesses, binary principal protocols and DNS.
/// `serverlist-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, TLS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request, socket exchange or subprocess timed out.
    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Socket or file IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ── Upstream responses ──────────────────────────────────────────
    /// Upstream answered with a status the caller did not expect.
    #[error("Unexpected HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Well-formed exchange carrying a payload we cannot make sense of.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── External tools ──────────────────────────────────────────────
    /// An external tool could not be run or reported a failure.
    #[error("{program} failed: {message}")]
    Subprocess { program: String, message: String },

    // ── Resolution ──────────────────────────────────────────────────
    /// DNS lookup returned no usable address.
    #[error("Could not resolve {host}")]
    Resolution { host: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::Io(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_secs: timeout.as_secs().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let gateway = Error::Status {
            status: 504,
            url: "https://example.com".into(),
        };
        assert!(gateway.is_transient());
        assert!(!gateway.is_not_found());

        let missing = Error::Status {
            status: 404,
            url: "https://example.com".into(),
        };
        assert!(!missing.is_transient());
        assert!(missing.is_not_found());
    }

    #[test]
    fn protocol_errors_are_not_retried() {
        assert!(!Error::protocol("bad header").is_transient());
        assert!(Error::timeout(std::time::Duration::from_millis(200)).is_transient());
    }
}
