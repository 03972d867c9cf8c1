// serverlist-api: clients for game server principals, HTTP browse APIs and
// the external query tools the lister shells out to

pub mod dns;
pub mod error;
pub mod http;
pub mod principal;
pub mod tools;
pub mod transport;

pub use dns::resolve_host;
pub use error::Error;
pub use http::{HttpClient, Lookup};
pub use principal::RawServer;
pub use transport::TransportConfig;
