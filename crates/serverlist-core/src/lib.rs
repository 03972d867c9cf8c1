//! Reconciliation engine between `serverlist-api` and the `serverlist` CLI.
//!
//! This crate owns the persisted server model and the logic that keeps a
//! list file in step with what upstream principals advertise:
//!
//! - **[`Lister`]**: one run against one list file. Loads the known set,
//!   merges freshly fetched candidates, sweeps expired entries and writes
//!   the result back atomically.
//!
//! - **[`Source`]**: the strategy trait every protocol family implements.
//!   The engine only ever talks to a source through it. Sources that need
//!   query port discovery also implement [`QueryPortSource`].
//!
//! - **[`ServerList`]**: insertion-ordered known set keyed by uid, with the
//!   merge rules for `via`, links and timestamps.
//!
//! - **Domain model** ([`model`]): the three persisted server shapes plus
//!   the value types they carry.

pub mod error;
pub mod expire;
pub mod links;
pub mod lister;
pub mod model;
pub mod paginate;
pub mod query_port;
pub mod source;
pub mod sources;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use expire::ExpireSummary;
pub use lister::{Lister, ListerOptions, RunSummary};
pub use paginate::PageOptions;
pub use query_port::{QueryPortStats, QueryTool};
pub use source::{PortValidator, ProbeOutcome, QueryPortSource, Source};
pub use store::ServerList;

pub use model::{
    ClassicServer, FrostbiteServer, GametoolsServer, QueryPort, Server, ViaStatus, WebLink,
};
