// ── Battlelog (bf3, bf4, bfh) ──

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serverlist_api::Lookup;
use serverlist_api::http::BattlelogClient;
use serverlist_api::tools::GamedigResponse;
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, warn};

use super::{PLATFORM, http_backoff};
use crate::error::CoreError;
use crate::links::{LinkContext, render_refs, template};
use crate::model::{FrostbiteServer, WebLink};
use crate::paginate::{self, PageOptions, PageSource};
use crate::source::{PortValidator, ProbeOutcome, QueryPortSource, Source};
use crate::store::ServerList;

const PER_PAGE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum BattlelogGame {
    Bf3,
    Bf4,
    Bfh,
}

pub struct BattlelogSource {
    client: BattlelogClient,
    game: BattlelogGame,
    page: PageOptions,
    add_links: bool,
}

impl BattlelogSource {
    pub fn new(client: BattlelogClient, game: BattlelogGame, page: PageOptions, add_links: bool) -> Self {
        Self {
            client,
            game,
            page,
            add_links,
        }
    }

    fn link_context<'a>(&'a self, uid: &'a str) -> LinkContext<'a> {
        LinkContext {
            game: self.game.as_ref(),
            platform: PLATFORM,
            uid,
            ..LinkContext::default()
        }
    }
}

impl PageSource for BattlelogSource {
    type Server = FrostbiteServer;

    async fn fetch_page(&self) -> Result<Vec<FrostbiteServer>, serverlist_api::Error> {
        let page = self
            .client
            .list_servers(self.game.as_ref(), PLATFORM, PER_PAGE)
            .await?;

        let servers = page
            .data
            .into_iter()
            .filter_map(|entry| {
                if entry.ip.is_empty() {
                    debug!(uid = %entry.guid, "ignoring private server");
                    return None;
                }
                let mut links = Vec::new();
                if self.add_links {
                    links = self.build_links(&entry.guid, None, None);
                    // gametools addresses BF4 servers by their game id
                    if self.game == BattlelogGame::Bf4 {
                        if let (Some(game_id), Some(gametools)) = (entry.game_id(), template("gametools")) {
                            links.push(gametools.render(&self.link_context(&game_id)));
                        }
                    }
                }
                Some(FrostbiteServer::new(entry.guid, entry.name, entry.ip, entry.port, links))
            })
            .collect();
        Ok(servers)
    }
}

impl Source for BattlelogSource {
    type Server = FrostbiteServer;

    fn name(&self) -> &str {
        "battlelog"
    }

    async fn fetch_candidates(&self) -> Result<Vec<FrostbiteServer>, CoreError> {
        Ok(paginate::fetch_all(self, self.page).await)
    }

    async fn check_existence(&self, server: &FrostbiteServer) -> ProbeOutcome {
        match self
            .client
            .server_is_public(self.game.as_ref(), PLATFORM, &server.guid)
            .await
        {
            Ok(Lookup::Found(true)) => ProbeOutcome::Found,
            Ok(Lookup::Found(false) | Lookup::NotFound) => ProbeOutcome::NotFound,
            Err(e) => {
                warn!(uid = %server.guid, error = %e, "failed to fetch server for expiration check");
                ProbeOutcome::Failed
            }
        }
    }

    fn build_links(&self, uid: &str, _ip: Option<&str>, _port: Option<u16>) -> Vec<WebLink> {
        // gametools uses the guid as game id for BF3 and BFH
        let refs: &[&str] = match self.game {
            BattlelogGame::Bf3 | BattlelogGame::Bfh => &["battlelog", "gametools"],
            BattlelogGame::Bf4 => &["battlelog"],
        };
        render_refs(refs.iter().copied(), &self.link_context(uid))
    }

    fn backoff(&self, failures: u32) -> Duration {
        http_backoff(self.page.sleep, self.page.max_attempts, failures)
    }
}

impl QueryPortSource for BattlelogSource {
    fn gamedig_type(&self) -> &str {
        self.game.as_ref()
    }

    fn port_candidates(&self, game_port: u16) -> Vec<i64> {
        let gp = i64::from(game_port);
        let mut rng = rand::thread_rng();
        vec![
            47200,      // default query port
            gp + 22000, // default offset
            gp,         // same port for game and query
            gp + 100,   // nitrado
            gp + 5,
            gp + 1,
            48888,
            gp + 6, // i3D
            gp + 8, // i3D
            gp + 10,
            gp + 15, // i3D
            gp + 50,
            gp - 5,  // i3D
            gp - 15, // i3D
            gp - 23000,
            rng.gen_range(47190..=47210),
            25200 + rng.gen_range(0..=22000),
            rng.gen_range(gp - 10..=gp + 10),
            gp + rng.gen_range(0..=22000),
        ]
    }

    fn port_validator(&self, _known: &ServerList<FrostbiteServer>) -> PortValidator {
        Arc::new(|server: &FrostbiteServer, response: &GamedigResponse| {
            response.connect() == Some(format!("{}:{}", server.ip, server.game_port).as_str())
        })
    }
}
