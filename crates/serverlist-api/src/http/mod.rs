//! HTTP browse APIs.

pub mod battlelog;
pub mod client;
pub mod fesl;
pub mod gametools;
pub mod mohaa;

pub use battlelog::{BATTLELOG_BASE_URL, BattlelogClient, BattlelogPage, BattlelogServer};
pub use client::{HttpClient, Lookup};
pub use fesl::{FESL_BASE_URL, FeslClient, FeslServer};
pub use gametools::{GAMETOOLS_BASE_URL, GametoolsClient, GametoolsDetail, GametoolsPage, GametoolsServer};
pub use mohaa::{MOHAA_SERVERS_BASE_URL, MohaaServersClient};
