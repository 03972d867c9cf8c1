// mohaaservers.tk text server lists
//
// The community principal for the Medal of Honor titles speaks a GameSpy
// dialect gslist cannot handle, but it also publishes plain `ip:port` lists.

use tracing::debug;
use url::Url;

use super::client::{HttpClient, join};
use crate::error::Error;

pub const MOHAA_SERVERS_BASE_URL: &str = "https://mohaaservers.tk/servlist";

pub struct MohaaServersClient {
    http: HttpClient,
    base_url: Url,
}

impl MohaaServersClient {
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch the raw list for a list key such as `aa` (for `mohaa`).
    pub async fn list(&self, key: &str) -> Result<String, Error> {
        let url = join(&self.base_url, &format!("servers_{key}.txt"))?;
        debug!(%url, "fetching text server list");
        self.http.get_text(url).await
    }
}
