// ── gametools.network (bf1, bfv) ──

use std::time::Duration;

use serverlist_api::Lookup;
use serverlist_api::http::GametoolsClient;
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, warn};

use super::{PLATFORM, http_backoff};
use crate::error::CoreError;
use crate::links::{LinkContext, render_refs};
use crate::model::{GametoolsServer, WebLink};
use crate::paginate::{self, PageOptions, PageSource};
use crate::source::{ProbeOutcome, Source};

const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum GametoolsGame {
    Bf1,
    Bfv,
}

pub struct GametoolsSource {
    client: GametoolsClient,
    game: GametoolsGame,
    page: PageOptions,
    add_links: bool,
    include_official: bool,
}

impl GametoolsSource {
    pub fn new(
        client: GametoolsClient,
        game: GametoolsGame,
        page: PageOptions,
        add_links: bool,
        include_official: bool,
    ) -> Self {
        Self {
            client,
            game,
            page,
            add_links,
            include_official,
        }
    }
}

impl PageSource for GametoolsSource {
    type Server = GametoolsServer;

    async fn fetch_page(&self) -> Result<Vec<GametoolsServer>, serverlist_api::Error> {
        let page = self.client.list_servers(self.game.as_ref(), PER_PAGE).await?;
        let servers = page
            .servers
            .into_iter()
            .filter_map(|entry| {
                if entry.official && !self.include_official {
                    debug!(uid = %entry.game_id, "ignoring official server");
                    return None;
                }
                let links = if self.add_links {
                    self.build_links(&entry.game_id, None, None)
                } else {
                    Vec::new()
                };
                Some(GametoolsServer::new(entry.game_id, entry.prefix, links))
            })
            .collect();
        Ok(servers)
    }
}

impl Source for GametoolsSource {
    type Server = GametoolsServer;

    fn name(&self) -> &str {
        "gametools"
    }

    async fn fetch_candidates(&self) -> Result<Vec<GametoolsServer>, CoreError> {
        Ok(paginate::fetch_all(self, self.page).await)
    }

    async fn check_existence(&self, server: &GametoolsServer) -> ProbeOutcome {
        match self.client.server_detail(self.game.as_ref(), &server.game_id).await {
            // Servers that turned official drop out unless they are wanted.
            Ok(Lookup::Found(detail)) if !detail.official || self.include_official => ProbeOutcome::Found,
            Ok(_) => ProbeOutcome::NotFound,
            Err(e) => {
                warn!(uid = %server.game_id, error = %e, "failed to fetch server for expiration check");
                ProbeOutcome::Failed
            }
        }
    }

    fn build_links(&self, uid: &str, _ip: Option<&str>, _port: Option<u16>) -> Vec<WebLink> {
        let ctx = LinkContext {
            game: self.game.as_ref(),
            platform: PLATFORM,
            uid,
            ..LinkContext::default()
        };
        render_refs(["gametools"], &ctx)
    }

    fn backoff(&self, failures: u32) -> Duration {
        http_backoff(self.page.sleep, self.page.max_attempts, failures)
    }

    /// Server names come in many scripts.
    fn ensure_ascii(&self) -> bool {
        false
    }
}
