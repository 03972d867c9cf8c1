// ── Valve master server ──

use std::collections::HashSet;
use std::time::Duration;

use serverlist_api::principal::valve::{self, Region, ValvePrincipal};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, error, info};

use super::{PLATFORM, checked_address, classic_server};
use crate::error::CoreError;
use crate::links::{LinkContext, LinkRefs};
use crate::model::{ClassicServer, WebLink};
use crate::source::{ProbeOutcome, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ValveGame {
    #[strum(serialize = "arkse")]
    ArkSurvivalEvolved,
    Arma2,
    Arma3,
    Cs,
    Cscz,
    Css,
    Csgo,
    DayZ,
    DayZMod,
    Dod,
    Dods,
    Rs2,
    Rust,
    #[strum(serialize = "7d2d")]
    SevenDaysToDie,
    Tfc,
    Tf2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ValvePrincipalName {
    Valve,
}

impl ValvePrincipalName {
    pub fn address(self) -> (&'static str, u16) {
        match self {
            Self::Valve => ("hl2master.steampowered.com", 27011),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValveGameConfig {
    pub app_id: u32,
    pub principals: &'static [ValvePrincipalName],
    /// The game port differs from the query port and has to be asked for.
    pub distinct_query_port: bool,
    pub links: LinkRefs,
}

const fn app(app_id: u32) -> ValveGameConfig {
    ValveGameConfig {
        app_id,
        principals: &[ValvePrincipalName::Valve],
        distinct_query_port: false,
        links: LinkRefs::NONE,
    }
}

const fn app_with_query_port(app_id: u32) -> ValveGameConfig {
    ValveGameConfig {
        distinct_query_port: true,
        ..app(app_id)
    }
}

impl ValveGame {
    pub fn config(self) -> ValveGameConfig {
        match self {
            Self::ArkSurvivalEvolved => app(346_110),
            Self::Arma2 => app_with_query_port(33930),
            Self::Arma3 => app_with_query_port(107_410),
            Self::Cs => app(10),
            Self::Cscz => app(80),
            Self::Css => app(240),
            Self::Csgo => app(730),
            Self::DayZ => app_with_query_port(221_100),
            Self::DayZMod => app_with_query_port(224_580),
            Self::Dod => app(30),
            Self::Dods => app(300),
            Self::Rs2 => app(418_460),
            Self::Rust => app(252_490),
            Self::SevenDaysToDie => app(251_570),
            Self::Tfc => app(20),
            Self::Tf2 => app(440),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValveOptions {
    pub filter: String,
    pub max_pages: u32,
    pub timeout: Duration,
    pub add_links: bool,
}

pub struct ValveSource {
    game: ValveGame,
    config: ValveGameConfig,
    principal: ValvePrincipalName,
    options: ValveOptions,
}

impl ValveSource {
    pub fn new(
        game: ValveGame,
        principal: Option<ValvePrincipalName>,
        options: ValveOptions,
    ) -> Result<Self, CoreError> {
        let config = game.config();
        let principal = match principal {
            Some(p) if config.principals.contains(&p) => p,
            Some(p) => {
                return Err(CoreError::Config {
                    message: format!("principal {p} is not available for {game}"),
                });
            }
            None => config
                .principals
                .first()
                .copied()
                .ok_or_else(|| CoreError::Internal(format!("{game} has no principals")))?,
        };
        Ok(Self {
            game,
            config,
            principal,
            options,
        })
    }

    fn filter(&self) -> String {
        format!("\\appid\\{}{}", self.config.app_id, self.options.filter)
    }

    /// Iterating regions keeps the number of consecutive requests per
    /// listing down. A failing region is skipped; the run only fails when
    /// every region did.
    async fn fetch_from(&self, principal: &ValvePrincipal) -> Result<Vec<ClassicServer>, CoreError> {
        let filter = self.filter();
        let wants_links = self.options.add_links && !self.config.links.is_empty();

        let mut seen = HashSet::new();
        let mut servers = Vec::new();
        let mut failed = 0usize;
        for region in Region::ALL {
            let raw = match principal.get_servers(&filter, region, self.options.max_pages).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!(?region, error = %e, "failed to query principal server");
                    failed += 1;
                    continue;
                }
            };
            info!(?region, entries = raw.len(), "principal answered");

            for entry in raw {
                let Some((ip, query_port)) = checked_address(&entry.ip.to_string(), i64::from(entry.query_port))
                else {
                    continue;
                };
                let mut server = classic_server(ip, query_port, self.principal.as_ref(), Vec::new());
                if !seen.insert(server.guid.clone()) {
                    continue;
                }
                if wants_links {
                    if let Some(game_port) = self.game_port(&server.ip, query_port).await {
                        server.links = self.build_links(&server.guid, Some(&server.ip), Some(game_port));
                    }
                }
                servers.push(server);
            }
        }

        if failed == Region::ALL.len() {
            return Err(CoreError::Exhausted {
                source_name: self.name().to_owned(),
                attempts: u32::try_from(failed).unwrap_or(u32::MAX),
            });
        }
        Ok(servers)
    }

    /// Port players connect to. Only games with a distinct query port need
    /// a query to learn it.
    async fn game_port(&self, ip: &str, query_port: u16) -> Option<u16> {
        if !self.config.distinct_query_port {
            return Some(query_port);
        }
        match valve::query_info(ip, query_port, self.options.timeout).await {
            Ok(info) => info.game_port,
            Err(e) => {
                debug!(ip, query_port, error = %e, "failed to query server for game port");
                None
            }
        }
    }
}

impl Source for ValveSource {
    type Server = ClassicServer;

    fn name(&self) -> &str {
        self.principal.as_ref()
    }

    async fn fetch_candidates(&self) -> Result<Vec<ClassicServer>, CoreError> {
        let (host, port) = self.principal.address();
        let principal = ValvePrincipal::new(host, port, self.options.timeout);
        self.fetch_from(&principal).await
    }

    async fn check_existence(&self, server: &ClassicServer) -> ProbeOutcome {
        let Some(port) = server.query_port.get() else {
            return ProbeOutcome::NotFound;
        };
        match valve::query_info(&server.ip, port, self.options.timeout).await {
            Ok(_) => ProbeOutcome::Found,
            Err(e) => {
                debug!(uid = %server.guid, error = %e, "failed to query server");
                ProbeOutcome::NotFound
            }
        }
    }

    fn build_links(&self, uid: &str, ip: Option<&str>, port: Option<u16>) -> Vec<WebLink> {
        let ctx = LinkContext {
            game: self.game.as_ref(),
            platform: PLATFORM,
            uid,
            ip,
            port,
        };
        self.config.links.render(self.principal.as_ref(), &ctx)
    }
}
