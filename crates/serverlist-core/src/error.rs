use thiserror::Error;

/// Unified error type for the lister engine and its sources.
///
/// Upstream failures from `serverlist-api` are folded in through the
/// `From` impl so sources can use `?` freely.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── List file ───────────────────────────────────────────────────
    #[error("Failed to load server list {path}: {reason}")]
    ListLoad { path: String, reason: String },

    #[error("Failed to write server list {path}: {reason}")]
    ListWrite { path: String, reason: String },

    // ── Fetching ────────────────────────────────────────────────────
    /// Every bounded retry of a fetch-driven source failed.
    #[error("{source_name}: no servers after {attempts} attempts")]
    Exhausted { source_name: String, attempts: u32 },

    #[error("Could not resolve principal host {host}")]
    Resolution { host: String },

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Setup ───────────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serverlist_api::Error> for CoreError {
    fn from(err: serverlist_api::Error) -> Self {
        use serverlist_api::Error as Api;
        match err {
            Api::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            Api::Resolution { host } => Self::Resolution { host },
            Api::Transport(ref e) if e.is_timeout() => Self::Timeout { timeout_secs: 0 },
            Api::Transport(ref e) if e.is_connect() => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::Io(e) => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::Status { status, url } => Self::Api {
                message: format!("HTTP {status} from {url}"),
                status: Some(status),
            },
            other => Self::Api {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
