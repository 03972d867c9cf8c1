// ── Quake3-family principals ──

use std::time::Duration;

use serverlist_api::principal::quake3::{self, GetServersQuery, Network, Quake3Principal, StatusDialect};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, info, warn};

use super::{FETCH_ATTEMPTS, PLATFORM, checked_address, classic_server, retry};
use crate::error::CoreError;
use crate::links::{LinkContext, LinkRefs};
use crate::model::{ClassicServer, WebLink};
use crate::source::{ProbeOutcome, Source};

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Quake3Game {
    Cod,
    CodUo,
    Cod2,
    Cod4,
    Cod4X,
    Nexuiz,
    OpenArena,
    Q3Rally,
    Quake,
    Quake3Arena,
    Rtcw,
    Sof2,
    SwJkJa,
    SwJkJo,
    Tremulous,
    UrbanTerror,
    Warfork,
    Warsow,
    WolfensteinEt,
    Xonotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quake3PrincipalConfig {
    pub name: &'static str,
    pub hostname: &'static str,
    pub port: u16,
}

const fn principal(name: &'static str, hostname: &'static str, port: u16) -> Quake3PrincipalConfig {
    Quake3PrincipalConfig { name, hostname, port }
}

#[derive(Debug, Clone, Copy)]
pub struct Quake3GameConfig {
    pub protocols: &'static [u32],
    /// Only set for shared dpmaster-style principals.
    pub game_name: &'static str,
    pub keywords: &'static str,
    pub network: Network,
    pub entry_prefix: &'static [u8],
    pub principals: &'static [Quake3PrincipalConfig],
    pub links: LinkRefs,
}

const fn game(protocols: &'static [u32], principals: &'static [Quake3PrincipalConfig]) -> Quake3GameConfig {
    Quake3GameConfig {
        protocols,
        game_name: "",
        keywords: "full empty",
        network: Network::Udp,
        entry_prefix: b"",
        principals,
        links: LinkRefs::NONE,
    }
}

const DEATHMASK: Quake3PrincipalConfig = principal("deathmask.net", "dpmaster.deathmask.net", 27950);

/// A game listed on the shared deathmask.net dpmaster.
const fn dpmaster(
    protocols: &'static [u32],
    game_name: &'static str,
    by_principal: &'static [(&'static str, &'static [&'static str])],
) -> Quake3GameConfig {
    Quake3GameConfig {
        game_name,
        links: LinkRefs {
            any: &[],
            by_principal,
        },
        ..game(protocols, &[DEATHMASK])
    }
}

const COD_LINKS: LinkRefs = LinkRefs {
    any: &[],
    by_principal: &[("activision", &["cod.pm"])],
};
const DEATHMASK_LINKS: &[(&str, &[&str])] = &[("deathmask.net", &["deathmask.net-official"])];
const DEATHMASK_ARENA_LINKS: &[(&str, &[&str])] = &[("deathmask.net", &["deathmask.net-official", "arena.sh"])];

impl Quake3Game {
    pub fn config(self) -> Quake3GameConfig {
        // const blocks keep the principal tables 'static
        match self {
            // 1.1 through 1.5
            Self::Cod => const {
                Quake3GameConfig {
                    links: COD_LINKS,
                    ..game(
                        &[1, 2, 4, 5, 6],
                        &const { [principal("activision", "codmaster.activision.com", 20510)] },
                    )
                }
            },
            Self::CodUo => const {
                Quake3GameConfig {
                    links: COD_LINKS,
                    ..game(&[21, 22], &const { [principal("activision", "coduomaster.activision.com", 20610)] })
                }
            },
            Self::Cod2 => const {
                Quake3GameConfig {
                    links: COD_LINKS,
                    ..game(
                        &[115, 117, 118],
                        &const { [principal("activision", "cod2master.activision.com", 20710)] },
                    )
                }
            },
            Self::Cod4 => const {
                Quake3GameConfig {
                    links: COD_LINKS,
                    ..game(&[1, 6, 7], &const { [principal("activision", "cod4master.activision.com", 20810)] })
                }
            },
            // Same servers for every protocol, so only one is asked for
            Self::Cod4X => const {
                Quake3GameConfig {
                    game_name: "cod4x",
                    keywords: "full empty \0",
                    network: Network::Tcp,
                    entry_prefix: b"\0\0\0\0\x04",
                    ..game(&[6], &const { [principal("cod4x.ovh", "cod4master.cod4x.ovh", 20810)] })
                }
            },
            Self::Nexuiz => dpmaster(&[3], "Nexuiz", DEATHMASK_LINKS),
            Self::OpenArena => dpmaster(&[71], "Quake3Arena", DEATHMASK_ARENA_LINKS),
            Self::Q3Rally => dpmaster(&[71], "Q3Rally", DEATHMASK_LINKS),
            Self::Quake => dpmaster(&[3], "DarkPlaces-Quake", DEATHMASK_LINKS),
            Self::Quake3Arena => const {
                game(
                    &[68],
                    &const { [
                        principal("quake3arena.com", "master.quake3arena.com", 27950),
                        principal("urbanterror.info-1", "master.urbanterror.info", 27900),
                        principal("urbanterror.info-2", "master2.urbanterror.info", 27900),
                        principal("excessiveplus.net", "master0.excessiveplus.net", 27950),
                        principal("ioquake3.org", "master.ioquake3.org", 27950),
                        principal("huxxer.de", "master.huxxer.de", 27950),
                        principal("maverickservers.com", "master.maverickservers.com", 27950),
                        DEATHMASK,
                    ] },
                )
            },
            Self::Rtcw => const {
                game(&[57], &const { [principal("idsoftware", "wolfmaster.idsoftware.com", 27950)] })
            },
            // demo, full and "gold"
            Self::Sof2 => const {
                game(
                    &[2001, 2002, 2004],
                    &const { [principal("ravensoft", "master.sof2.ravensoft.com", 20110)] },
                )
            },
            Self::SwJkJa => const {
                game(
                    &[25, 26],
                    &const { [
                        principal("ravensoft", "masterjk3.ravensoft.com", 29060),
                        principal("jkhub.org", "master.jkhub.org", 29060),
                    ] },
                )
            },
            Self::SwJkJo => const {
                game(
                    &[15, 16],
                    &const { [
                        principal("ravensoft", "masterjk2.ravensoft.com", 28060),
                        principal("jkhub.org", "master.jkhub.org", 28060),
                    ] },
                )
            },
            Self::Tremulous => const {
                Quake3GameConfig {
                    links: LinkRefs {
                        any: &[],
                        by_principal: &[("tremulous.net", &["deathmask.net-unofficial"])],
                    },
                    ..game(&[69], &const { [principal("tremulous.net", "master.tremulous.net", 30710)] })
                }
            },
            Self::UrbanTerror => const {
                Quake3GameConfig {
                    links: LinkRefs {
                        any: &[],
                        by_principal: &[("urbanterror.info", &["deathmask.net-unofficial"])],
                    },
                    ..game(&[68], &const { [principal("urbanterror.info", "master.urbanterror.info", 27900)] })
                }
            },
            Self::Warfork => dpmaster(&[23], "Warfork", DEATHMASK_LINKS),
            Self::Warsow => dpmaster(&[22], "Warsow", DEATHMASK_ARENA_LINKS),
            Self::WolfensteinEt => const {
                game(
                    &[84],
                    &const { [
                        principal("idsoftware", "etmaster.idsoftware.com", 27950),
                        principal("etlegacy.com", "master.etlegacy.com", 27950),
                        principal("etmaster.net", "master0.etmaster.net", 27950),
                    ] },
                )
            },
            Self::Xonotic => const {
                Quake3GameConfig {
                    principals: &const { [DEATHMASK, principal("tchr.no", "dpmaster.tchr.no", 27950)] },
                    ..dpmaster(&[3], "Xonotic", DEATHMASK_ARENA_LINKS)
                }
            },
        }
    }
}

pub struct Quake3Source {
    game: Quake3Game,
    config: Quake3GameConfig,
    principal: Quake3PrincipalConfig,
    timeout: Duration,
    add_links: bool,
}

impl Quake3Source {
    pub fn new(game: Quake3Game, principal: &str, timeout: Duration, add_links: bool) -> Result<Self, CoreError> {
        let config = game.config();
        let principal = config
            .principals
            .iter()
            .find(|p| p.name == principal)
            .copied()
            .ok_or_else(|| CoreError::Config {
                message: format!(
                    "principal {principal} is not available for {game}, expected one of: {}",
                    config
                        .principals
                        .iter()
                        .map(|p| p.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })?;
        Ok(Self {
            game,
            config,
            principal,
            timeout,
            add_links,
        })
    }

    /// Lists every protocol in turn. A protocol that keeps failing is
    /// skipped; the run only fails when none of them answered.
    async fn fetch_from(&self, principal: &Quake3Principal) -> Result<Vec<ClassicServer>, CoreError> {
        let mut servers = Vec::new();
        let mut answered = false;
        for &protocol in self.config.protocols {
            let query = self.query(protocol);
            let raw = match retry(self.name(), FETCH_ATTEMPTS, |_| principal.get_servers(&query)).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(protocol, error = %e, "giving up on protocol");
                    continue;
                }
            };
            answered = true;
            info!(protocol, entries = raw.len(), "principal answered");

            for entry in raw {
                let Some((ip, port)) = checked_address(&entry.ip.to_string(), i64::from(entry.query_port)) else {
                    continue;
                };
                let mut server = classic_server(ip, port, self.principal.name, Vec::new());
                if self.add_links {
                    server.links = self.build_links(&server.guid, Some(&server.ip), Some(port));
                }
                servers.push(server);
            }
        }

        if !answered {
            return Err(CoreError::Exhausted {
                source_name: self.name().to_owned(),
                attempts: FETCH_ATTEMPTS,
            });
        }
        Ok(servers)
    }

        fn query(&self, protocol: u32) -> GetServersQuery<'static> {
        GetServersQuery {
            protocol,
            game_name: self.config.game_name,
            keywords: self.config.keywords,
            entry_prefix: self.config.entry_prefix,
        }
    }
}

impl Source for Quake3Source {
    type Server = ClassicServer;

    fn name(&self) -> &str {
        self.principal.name
    }

    async fn fetch_candidates(&self) -> Result<Vec<ClassicServer>, CoreError> {
        let principal = Quake3Principal::new(
            self.principal.hostname,
            self.principal.port,
            self.config.network,
            self.timeout,
        );
        self.fetch_from(&principal).await
    }

    async fn check_existence(&self, server: &ClassicServer) -> ProbeOutcome {
        let Some(port) = server.query_port.get() else {
            return ProbeOutcome::NotFound;
        };
        match quake3::get_status(&server.ip, port, StatusDialect::Quake3, STATUS_TIMEOUT).await {
            Ok(_) => ProbeOutcome::Found,
            Err(e) => {
                debug!(uid = %server.guid, error = %e, "failed to query server for expiration check");
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
        self.config.links.render(self.principal.name, &ctx)
    }
}
