//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use serverlist_config::ConfigError;
use serverlist_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const LIST_FILE: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── List file ────────────────────────────────────────────────────
    #[error("Could not read server list {path}: {reason}")]
    #[diagnostic(
        code(serverlist::list_load),
        help("The file has to hold a JSON array of servers. Move it aside to start a fresh list.")
    )]
    ListLoad { path: String, reason: String },

    #[error("Could not write server list {path}: {reason}")]
    #[diagnostic(
        code(serverlist::list_write),
        help("Check that the list directory exists and is writable, or pass another one with --list-dir.")
    )]
    ListWrite { path: String, reason: String },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("{source_name} returned no servers after {attempts} attempts")]
    #[diagnostic(
        code(serverlist::exhausted),
        help("The principal may be down. Run again later or with -v to see each failure.")
    )]
    Exhausted { source_name: String, attempts: u32 },

    #[error("Could not resolve {host}")]
    #[diagnostic(code(serverlist::resolution), help("Check DNS and network connectivity."))]
    Resolution { host: String },

    #[error("Connection failed: {reason}")]
    #[diagnostic(code(serverlist::connection_failed))]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(code(serverlist::timeout), help("Increase the timeout with --timeout where available."))]
    Timeout { seconds: u64 },

    #[error("Upstream error: {message}")]
    #[diagnostic(code(serverlist::upstream))]
    Upstream { message: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(serverlist::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(serverlist::config),
        help("Check the config file and SERVERLIST_* environment variables.")
    )]
    Config { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(serverlist::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ListLoad { .. } | Self::ListWrite { .. } => exit_code::LIST_FILE,
            Self::Resolution { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config { .. } => exit_code::USAGE,
            Self::Exhausted { .. } | Self::Upstream { .. } | Self::Internal(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ListLoad { path, reason } => Self::ListLoad { path, reason },
            CoreError::ListWrite { path, reason } => Self::ListWrite { path, reason },
            CoreError::Exhausted { source_name, attempts } => Self::Exhausted { source_name, attempts },
            CoreError::Resolution { host } => Self::Resolution { host },
            CoreError::Timeout { timeout_secs } => Self::Timeout { seconds: timeout_secs },
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::Api { message, .. } => Self::Upstream { message },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<serverlist_api::Error> for CliError {
    fn from(err: serverlist_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let load: CliError = CoreError::ListLoad {
            path: "lists/bf4-servers.json".into(),
            reason: "not an array".into(),
        }
        .into();
        assert_eq!(load.exit_code(), exit_code::LIST_FILE);

        let exhausted: CliError = CoreError::Exhausted {
            source_name: "fesl".into(),
            attempts: 3,
        }
        .into();
        assert_eq!(exhausted.exit_code(), exit_code::GENERAL);

        let dns: CliError = CoreError::Resolution { host: "master.example.com".into() }.into();
        assert_eq!(dns.exit_code(), exit_code::CONNECTION);

        let timeout: CliError = CoreError::Timeout { timeout_secs: 5 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let config: CliError = CoreError::Config {
            message: "principal is not available".into(),
        }
        .into();
        assert_eq!(config.exit_code(), exit_code::USAGE);
    }
}
