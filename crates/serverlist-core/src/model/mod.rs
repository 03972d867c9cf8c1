//! Persisted server records and the value types they carry.

pub mod identity;
pub mod link;
pub mod server;
pub mod time;
pub mod via;

pub use identity::{QueryPort, guid_from_ip_port, is_valid_port, is_valid_public_ip};
pub use link::{WebLink, merge_links};
pub use server::{ClassicServer, FrostbiteServer, GametoolsServer, Server};
pub use via::{ViaStatus, merge_via};
