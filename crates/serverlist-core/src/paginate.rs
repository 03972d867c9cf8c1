// ── Paginated fetch loop ──
//
// Browse APIs whose pagination is broken return a near-random subset of
// servers on every call to the first page. Keep asking until enough calls
// in a row bring nothing new.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, error, info};

use crate::model::Server;

/// One logical page request.
pub trait PageSource: Send + Sync {
    type Server: Server;

    /// Fetch one page, already filtered down to the servers worth keeping.
    fn fetch_page(&self) -> impl Future<Output = Result<Vec<Self::Server>, serverlist_api::Error>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageOptions {
    /// Stop after this many consecutive calls without a new server.
    pub page_limit: u32,
    /// Base of the exponential delay between calls, in seconds.
    pub sleep: f64,
    /// Stop after this many consecutive failed calls.
    pub max_attempts: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_limit: 10,
            sleep: 0.0,
            max_attempts: 3,
        }
    }
}

/// `base^exp` seconds, clamped to something sleepable.
pub(crate) fn pow_secs(base: f64, exp: u32) -> Duration {
    let secs = base.powi(i32::try_from(exp).unwrap_or(i32::MAX));
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 { Duration::MAX } else { Duration::ZERO })
}

/// Collect unique servers until the page stops yielding new ones or the
/// upstream keeps failing. Failures never surface: whatever was gathered
/// is returned.
pub async fn fetch_all<P: PageSource>(pages: &P, opts: PageOptions) -> Vec<P::Server> {
    let mut found: IndexMap<String, P::Server> = IndexMap::new();
    let mut pages_since_unique = 0u32;
    let mut attempt = 0u32;
    let mut pages_ok = 0u32;

    info!("starting server list retrieval");
    while pages_since_unique < opts.page_limit && attempt < opts.max_attempts {
        if pages_ok > 0 {
            tokio::time::sleep(pow_secs(opts.sleep, attempt + 1)).await;
        }

        let page = match pages.fetch_page().await {
            Ok(page) => page,
            Err(e) => {
                attempt += 1;
                error!(error = %e, attempt, max_attempts = opts.max_attempts, "page request failed");
                continue;
            }
        };
        attempt = 0;
        pages_ok += 1;

        let before = found.len();
        let now = Utc::now();
        for server in page {
            if let Some(known) = found.get_mut(server.uid()) {
                known.touch(now);
            } else {
                found.insert(server.uid().to_owned(), server);
            }
        }

        let new = found.len() - before;
        if new == 0 {
            pages_since_unique += 1;
            info!(page = pages_ok, pages_since_unique, "got nothing but duplicates");
        } else {
            pages_since_unique = 0;
            info!(new, "got new servers");
        }
    }

    debug!(total = found.len(), pages = pages_ok, "server list retrieval finished");
    found.into_values().collect()
}
