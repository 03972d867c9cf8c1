//! Source adapters, one per protocol family.
//!
//! Each adapter owns its static game/principal tables and turns upstream
//! records into the shared server types. Helpers here cover what several
//! families do the same way: bounded retries, address validation and the
//! HTTP recovery backoff.

pub mod battlelog;
pub mod bfbc2;
pub mod gamespy;
pub mod gametools;
pub mod medalofhonor;
pub mod quake3;
pub mod unreal2;
pub mod valve;

use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::CoreError;
use crate::model::{ClassicServer, WebLink, guid_from_ip_port, is_valid_port, is_valid_public_ip};
use crate::paginate::pow_secs;

/// Attempts made by fetch-driven sources before giving up.
pub const FETCH_ATTEMPTS: u32 = 3;

/// Base of the exponential sleep between fetch attempts, in seconds.
pub const RETRY_SLEEP: f64 = 2.0;

/// Platform segment used by the HTTP browse APIs.
pub const PLATFORM: &str = "pc";

/// Run `op` up to `attempts` times, returning the first success. Attempt
/// `n > 0` waits `RETRY_SLEEP^n` seconds first.
pub(crate) async fn retry<T, F, Fut>(source_name: &str, attempts: u32, mut op: F) -> Result<T, CoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, serverlist_api::Error>>,
{
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(pow_secs(RETRY_SLEEP, attempt)).await;
        }
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => error!(
                source = source_name,
                error = %e,
                attempt = attempt + 1,
                attempts,
                "fetch failed"
            ),
        }
    }
    Err(CoreError::Exhausted {
        source_name: source_name.to_owned(),
        attempts,
    })
}

/// Validate a principal entry, logging and rejecting unusable ones.
pub(crate) fn checked_address(ip: &str, port: i64) -> Option<(Ipv4Addr, u16)> {
    if !is_valid_public_ip(ip) || !is_valid_port(port) {
        warn!(ip, port, "principal returned invalid server entry, skipping it");
        return None;
    }
    Some((ip.parse().ok()?, u16::try_from(port).ok()?))
}

/// A classic server identified by its query address.
pub(crate) fn classic_server(ip: Ipv4Addr, query_port: u16, principal: &str, links: Vec<WebLink>) -> ClassicServer {
    ClassicServer::new(
        guid_from_ip_port(ip, query_port),
        ip.to_string(),
        query_port,
        principal,
        links,
    )
}

/// Recovery backoff for HTTP sources: `1 + sleep^(failures % max_attempts)`
/// seconds.
pub(crate) fn http_backoff(sleep: f64, max_attempts: u32, failures: u32) -> Duration {
    let exp = failures.checked_rem(max_attempts).unwrap_or(0);
    Duration::from_secs(1).saturating_add(pow_secs(sleep, exp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry("test", 3, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 1 {
                    Err(serverlist_api::Error::Timeout { timeout_secs: 1 })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_is_an_error() {
        let result: Result<(), _> = retry("mohaaservers.tk", 3, |_| async {
            Err(serverlist_api::Error::Timeout { timeout_secs: 1 })
        })
        .await;
        assert!(matches!(
            result,
            Err(CoreError::Exhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_sleeps_exponentially_between_attempts() {
        let start = tokio::time::Instant::now();
        let started = std::sync::Mutex::new(Vec::new());
        let _ = retry("test", 3, |_| {
            started.lock().unwrap().push(start.elapsed());
            async { Err::<(), _>(serverlist_api::Error::Timeout { timeout_secs: 1 }) }
        })
        .await;
        assert_eq!(
            *started.lock().unwrap(),
            [Duration::ZERO, Duration::from_secs(2), Duration::from_secs(6)]
        );
    }

    #[test]
    fn address_checks() {
        assert_eq!(
            checked_address("81.169.230.12", 29900),
            Some((Ipv4Addr::new(81, 169, 230, 12), 29900))
        );
        assert_eq!(checked_address("10.0.0.1", 29900), None);
        assert_eq!(checked_address("81.169.230.12", 0), None);
    }

    #[test]
    fn http_backoff_wraps_at_max_attempts() {
        assert_eq!(http_backoff(2.0, 3, 0), Duration::from_secs(2));
        assert_eq!(http_backoff(2.0, 3, 2), Duration::from_secs(5));
        assert_eq!(http_backoff(2.0, 3, 3), Duration::from_secs(2));
        assert_eq!(http_backoff(0.0, 3, 1), Duration::from_secs(1));
    }
}
