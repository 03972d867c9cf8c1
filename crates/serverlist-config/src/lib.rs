//! Defaults for every `serverlist` option, from a TOML file and the
//! environment.
//!
//! Layering is built-in defaults, then `config.toml`, then `SERVERLIST_*`
//! variables (nested keys split on `__`, e.g. `SERVERLIST_HTTP__PAGE_LIMIT`).
//! Explicit command-line flags win over all of it; that last step lives in
//! the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::SecretString;
use serde::Deserialize;
use serverlist_api::TransportConfig;
use serverlist_api::http::{BATTLELOG_BASE_URL, FESL_BASE_URL, GAMETOOLS_BASE_URL, MOHAA_SERVERS_BASE_URL};
use serverlist_core::PageOptions;
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "SERVERLIST_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    pub http: HttpSettings,
    pub upstream: Upstream,
    pub query_port: QueryPortSettings,
    pub gamespy: GamespySettings,
    pub unreal2: Unreal2Settings,
}

/// Options shared by every list subcommand.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub list_dir: PathBuf,
    /// Hours after which an unseen server is considered expired.
    pub expired_ttl: f64,
    pub recover: bool,
    pub add_links: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            list_dir: PathBuf::from("lists"),
            expired_ttl: 12.0,
            recover: true,
            add_links: false,
        }
    }
}

/// Settings for the HTTP browse APIs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub page_limit: u32,
    pub sleep: f64,
    pub max_attempts: u32,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub proxy: Option<Url>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let page = PageOptions::default();
        Self {
            page_limit: page.page_limit,
            sleep: page.sleep,
            max_attempts: page.max_attempts,
            timeout: 10,
            proxy: None,
        }
    }
}

impl HttpSettings {
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            page_limit: self.page_limit,
            sleep: self.sleep,
            max_attempts: self.max_attempts,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.timeout),
            ..TransportConfig::default()
        }
        .with_proxy(self.proxy.clone())
    }
}

/// Base URLs of the HTTP upstreams. Only worth changing for mirrors and
/// local fakes.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Upstream {
    pub battlelog: String,
    pub gametools: String,
    pub fesl: String,
    pub mohaaservers: String,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            battlelog: BATTLELOG_BASE_URL.into(),
            gametools: GAMETOOLS_BASE_URL.into(),
            fesl: FESL_BASE_URL.into(),
            mohaaservers: MOHAA_SERVERS_BASE_URL.into(),
        }
    }
}

impl Upstream {
    /// Parse one of the base URLs, naming the offending key on failure.
    pub fn url(field: &str, raw: &str) -> Result<Url, ConfigError> {
        Url::parse(raw).map_err(|e| ConfigError::Validation {
            field: format!("upstream.{field}"),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueryPortSettings {
    pub gamedig_bin: PathBuf,
    pub gamedig_concurrency: usize,
}

impl Default for QueryPortSettings {
    fn default() -> Self {
        Self {
            gamedig_bin: PathBuf::from("/usr/bin/gamedig"),
            gamedig_concurrency: 12,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GamespySettings {
    pub gslist_bin: Option<PathBuf>,
    /// Seconds before a gslist invocation is killed.
    pub timeout: u64,
}

impl Default for GamespySettings {
    fn default() -> Self {
        Self {
            gslist_bin: None,
            timeout: 10,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Unreal2Settings {
    pub cd_key: Option<SecretString>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "cetteup", "serverlist").map(|dirs| dirs.config_dir().join("config.toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered figment for an explicit file, or the platform default one.
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new();
    if let Some(path) = path.map(Path::to_path_buf).or_else(config_path) {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the config. An explicitly named file has to exist; the default one
/// is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }
    }
    extract(&figment(path))
}

fn extract(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    if !config.defaults.expired_ttl.is_finite() || config.defaults.expired_ttl < 0.0 {
        return Err(ConfigError::Validation {
            field: "defaults.expired_ttl".into(),
            reason: format!("{} is not a usable number of hours", config.defaults.expired_ttl),
        });
    }
    if config.http.max_attempts == 0 {
        return Err(ConfigError::Validation {
            field: "http.max_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }
    if config.query_port.gamedig_concurrency == 0 {
        return Err(ConfigError::Validation {
            field: "query_port.gamedig_concurrency".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn from_toml(raw: &str) -> Result<Config, ConfigError> {
        extract(&Figment::new().merge(Toml::string(raw)))
    }

    #[test]
    fn empty_file_gives_builtin_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.defaults.list_dir, PathBuf::from("lists"));
        assert!((config.defaults.expired_ttl - 12.0).abs() < f64::EPSILON);
        assert!(config.defaults.recover);
        assert_eq!(config.http.page_options(), PageOptions::default());
        assert_eq!(config.query_port.gamedig_concurrency, 12);
        assert_eq!(config.upstream.mohaaservers, "https://mohaaservers.tk/servlist");
        assert!(config.unreal2.cd_key.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = from_toml(
            r#"
            [defaults]
            list_dir = "/var/lib/serverlist"
            recover = false

            [http]
            page_limit = 25
            proxy = "http://127.0.0.1:3128"

            [upstream]
            mohaaservers = "http://127.0.0.1:8080/lists"

            [unreal2]
            cd_key = "ABCDE-FGHIJ"
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.list_dir, PathBuf::from("/var/lib/serverlist"));
        assert!(!config.defaults.recover);
        assert_eq!(config.http.page_limit, 25);
        assert_eq!(config.http.max_attempts, 3);
        assert!(config.http.transport().proxy.is_some());
        assert_eq!(config.upstream.mohaaservers, "http://127.0.0.1:8080/lists");
        assert!(Upstream::url("mohaaservers", &config.upstream.mohaaservers).is_ok());
        assert!(Upstream::url("fesl", "not a url").is_err());
        assert_eq!(config.unreal2.cd_key.unwrap().expose_secret(), "ABCDE-FGHIJ");
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = from_toml("[http]\nmax_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn explicit_file_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn loads_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[gamespy]\ngslist_bin = \"/opt/gslist\"\ntimeout = 30\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.gamespy.gslist_bin, Some(PathBuf::from("/opt/gslist")));
        assert_eq!(config.gamespy.timeout, 30);
    }
}
