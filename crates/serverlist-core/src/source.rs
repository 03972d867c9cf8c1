// ── Source strategy ──
//
// The engine is written once against these traits. Each protocol family
// provides one implementation; the engine never inspects which.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serverlist_api::tools::GamedigResponse;

use crate::error::CoreError;
use crate::model::{FrostbiteServer, Server, WebLink};
use crate::store::ServerList;

/// Result of a direct existence check against one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The check completed and the server is still there.
    Found,
    /// The check completed and the server is gone.
    NotFound,
    /// The check could not complete. Never grounds for removal.
    Failed,
}

pub trait Source: Send + Sync {
    type Server: Server;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the servers currently advertised upstream.
    ///
    /// Bounded retries happen inside. Fetch-driven sources return
    /// [`CoreError::Exhausted`] when every attempt failed; paginated sources
    /// return whatever they accumulated.
    fn fetch_candidates(&self) -> impl Future<Output = Result<Vec<Self::Server>, CoreError>> + Send;

    /// Check whether a server that dropped out of the upstream list is
    /// still alive.
    fn check_existence(&self, server: &Self::Server) -> impl Future<Output = ProbeOutcome> + Send;

    /// Links for a server, by uid and (where known) address.
    fn build_links(&self, _uid: &str, _ip: Option<&str>, _port: Option<u16>) -> Vec<WebLink> {
        Vec::new()
    }

    /// Delay before the next recovery probe after `failures` consecutive
    /// failed probes.
    fn backoff(&self, _failures: u32) -> Duration {
        Duration::ZERO
    }

    /// Whether the list file escapes non-ASCII characters.
    fn ensure_ascii(&self) -> bool {
        true
    }
}

/// Decides whether a query response really came from the given server.
pub type PortValidator = Arc<dyn Fn(&FrostbiteServer, &GamedigResponse) -> bool + Send + Sync>;

/// Sources whose servers need their query port discovered.
pub trait QueryPortSource: Source<Server = FrostbiteServer> {
    /// Probe tool game type.
    fn gamedig_type(&self) -> &str;

    /// Ordered candidate ports for a server on `game_port`. May contain
    /// out-of-range values; the scheduler filters them.
    fn port_candidates(&self, game_port: u16) -> Vec<i64>;

    fn port_validator(&self, known: &ServerList<FrostbiteServer>) -> PortValidator;
}
