//! CLI configuration: a thin layer over `serverlist_config`.
//!
//! Every helper here takes the parsed flags plus the loaded config and
//! applies flag > env/file > built-in default.

use std::path::PathBuf;
use std::time::Duration;

use serverlist_api::TransportConfig;
use serverlist_api::tools::Gamedig;
use serverlist_core::model::time;
use serverlist_core::{ListerOptions, PageOptions};
use url::Url;

use crate::cli::{CommonArgs, HttpArgs, QueryPortArgs};
use crate::error::CliError;

pub use serverlist_config::{Config, Upstream, load_config};

/// Upper bound for a single gamedig run; it retries internally.
const GAMEDIG_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how the list for `game` is kept.
pub fn lister_options(common: &CommonArgs, config: &Config, game: &str) -> Result<ListerOptions, CliError> {
    let hours = common.expired_ttl.unwrap_or(config.defaults.expired_ttl);
    if !hours.is_finite() || hours < 0.0 {
        return Err(CliError::Validation {
            field: "expired-ttl".into(),
            reason: format!("{hours} is not a usable number of hours"),
        });
    }
    Ok(ListerOptions {
        list_dir: common
            .list_dir
            .clone()
            .unwrap_or_else(|| config.defaults.list_dir.clone()),
        game: game.to_owned(),
        expired_ttl: time::hours(hours),
        recover: !common.no_recover && config.defaults.recover,
    })
}

pub fn add_links(common: &CommonArgs, config: &Config) -> bool {
    common.add_links || config.defaults.add_links
}

pub fn page_options(http: &HttpArgs, config: &Config) -> Result<PageOptions, CliError> {
    let defaults = config.http.page_options();
    let options = PageOptions {
        page_limit: http.page_limit.unwrap_or(defaults.page_limit),
        sleep: http.sleep.unwrap_or(defaults.sleep),
        max_attempts: http.max_attempts.unwrap_or(defaults.max_attempts),
    };
    if options.max_attempts == 0 {
        return Err(CliError::Validation {
            field: "max-attempts".into(),
            reason: "must be at least 1".into(),
        });
    }
    if !options.sleep.is_finite() || options.sleep < 0.0 {
        return Err(CliError::Validation {
            field: "sleep".into(),
            reason: format!("{} is not a usable number of seconds", options.sleep),
        });
    }
    Ok(options)
}

/// HTTP transport for the browse APIs, with the proxy flag applied.
pub fn transport(http: Option<&HttpArgs>, config: &Config) -> TransportConfig {
    let transport = config.http.transport();
    match http.and_then(|h| h.proxy.clone()) {
        Some(proxy) => transport.with_proxy(Some(proxy)),
        None => transport,
    }
}

pub fn upstream_url(field: &str, raw: &str) -> Result<Url, CliError> {
    Ok(Upstream::url(field, raw)?)
}

/// Gamedig runner and pool width, when discovery was asked for.
pub fn query_port_tool(args: &QueryPortArgs, config: &Config) -> Result<Option<(Gamedig, usize)>, CliError> {
    if !args.find_query_port {
        return Ok(None);
    }
    let bin: PathBuf = args
        .gamedig_bin
        .clone()
        .unwrap_or_else(|| config.query_port.gamedig_bin.clone());
    let concurrency = args
        .gamedig_concurrency
        .unwrap_or(config.query_port.gamedig_concurrency);
    if concurrency == 0 {
        return Err(CliError::Validation {
            field: "gamedig-concurrency".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(Some((Gamedig::new(bin, GAMEDIG_TIMEOUT), concurrency)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn common() -> CommonArgs {
        CommonArgs {
            expired_ttl: None,
            list_dir: None,
            no_recover: false,
            add_links: false,
            debug: false,
        }
    }

    #[test]
    fn flags_win_over_config() {
        let config = Config::default();
        let mut args = common();
        assert_eq!(
            lister_options(&args, &config, "bf4").unwrap().expired_ttl,
            TimeDelta::hours(12)
        );

        args.expired_ttl = Some(1.5);
        args.list_dir = Some(PathBuf::from("/tmp/lists"));
        args.no_recover = true;
        let options = lister_options(&args, &config, "bf4").unwrap();
        assert_eq!(options.expired_ttl, TimeDelta::minutes(90));
        assert_eq!(options.list_dir, PathBuf::from("/tmp/lists"));
        assert!(!options.recover);
    }

    #[test]
    fn rejects_negative_ttl() {
        let mut args = common();
        args.expired_ttl = Some(-1.0);
        assert!(matches!(
            lister_options(&args, &Config::default(), "bf4"),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn discovery_off_without_flag() {
        let args = QueryPortArgs {
            find_query_port: false,
            gamedig_bin: None,
            gamedig_concurrency: None,
        };
        assert!(query_port_tool(&args, &Config::default()).unwrap().is_none());
    }
}
