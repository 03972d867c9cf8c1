// ── GameSpy principals via gslist ──
//
// gslist does the actual master server work. The list is fetched into the
// list dir, then candidates are optionally queried one by one to verify
// the game and learn the game port for links.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use serverlist_api::resolve_host;
use serverlist_api::tools::{Gslist, GslistListRequest};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, info, warn};

use super::{FETCH_ATTEMPTS, PLATFORM, checked_address, classic_server, retry};
use crate::error::CoreError;
use crate::links::{LinkContext, LinkRefs};
use crate::model::{ClassicServer, WebLink};
use crate::source::{ProbeOutcome, Source};

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Principals ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
pub enum GamespyPrincipal {
    #[strum(serialize = "333networks.com-1")]
    ThreeThreeThreeNetworks1,
    #[strum(serialize = "bf1942.org")]
    Bf1942Org,
    #[strum(serialize = "bf2hub.com")]
    Bf2Hub,
    #[strum(serialize = "crymp.net")]
    CrympNet,
    #[strum(serialize = "epicgames.com")]
    EpicGamesUt3,
    #[strum(serialize = "errorist.eu")]
    ErroristEu,
    #[strum(serialize = "fh2.dev")]
    Fh2Dev,
    #[strum(serialize = "jedi95.us")]
    Jedi95Us,
    #[strum(serialize = "nightfirepc.com")]
    NightfirePc,
    #[strum(serialize = "novgames.ru")]
    NovGames,
    #[strum(serialize = "oldunreal.com-1")]
    OldUnreal1,
    #[strum(serialize = "openspy.net")]
    OpenSpy,
    #[strum(serialize = "phoenixnetwork.net")]
    PhoenixNetwork,
    #[strum(serialize = "play2142.ru")]
    Play2142,
    #[strum(serialize = "playbf2.ru")]
    PlayBf2,
    #[strum(serialize = "qtracker.com")]
    Qtracker,
    #[strum(serialize = "swat4stats.com")]
    Swat4Stats,
    #[strum(serialize = "vietcong.tk")]
    VietcongTk,
    #[strum(serialize = "vietcong1.eu")]
    Vietcong1Eu,
}

impl GamespyPrincipal {
    /// Hostname template; `{0}` is replaced by the gslist game name.
    pub fn hostname(self) -> &'static str {
        match self {
            Self::ThreeThreeThreeNetworks1 => "master.333networks.com",
            Self::Bf1942Org => "master.bf1942.org",
            Self::Bf2Hub => "servers.bf2hub.com",
            Self::CrympNet => "master.crymp.net",
            Self::EpicGamesUt3 => "ut3master1.epicgames.com",
            Self::ErroristEu => "master.errorist.eu",
            Self::Fh2Dev => "ms.fh2.dev",
            Self::Jedi95Us => "master.g.jedi95.us",
            Self::NightfirePc => "master.nightfirepc.com",
            Self::NovGames => "2142.novgames.ru",
            Self::OldUnreal1 => "master.oldunreal.com",
            Self::OpenSpy => "{0}.master.openspy.net",
            Self::PhoenixNetwork => "master.phoenixnetwork.net",
            Self::Play2142 => "{0}.ms.play2142.ru",
            Self::PlayBf2 => "{0}.ms.playbf2.ru",
            Self::Qtracker => "master2.qtracker.com",
            Self::Swat4Stats => "master.swat4stats.com",
            Self::VietcongTk => "brvps.tk",
            Self::Vietcong1Eu => "vietcong1.eu",
        }
    }

    /// Added to the game's principal port.
    pub fn port_offset(self) -> u16 {
        match self {
            Self::Bf2Hub => 1,
            _ => 0,
        }
    }
}

// ── Games ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum GamespyGame {
    Bf1942,
    BfVietnam,
    Bf2,
    Fh2,
    Bf2142,
    Crysis,
    CrysisWars,
    JbNightfire,
    Paraworld,
    Postal2,
    Swat4,
    Unreal,
    Ut,
    Ut3,
    Vietcong,
    Vietcong2,
}

/// How to talk to a game's principals.
#[derive(Debug, Clone, Copy)]
pub struct GamespyGameConfig {
    pub game_name: &'static str,
    pub game_key: &'static str,
    pub enc_type: i32,
    pub query_type: i32,
    pub port: u16,
    /// Allowed principals, default first.
    pub principals: &'static [GamespyPrincipal],
    /// Some principals only answer with a non-default list type byte.
    pub list_type: Option<i32>,
    /// Some principals only answer when an info query is sent.
    pub info_query: Option<&'static str>,
    pub links: LinkRefs,
}

const fn game(
    game_name: &'static str,
    game_key: &'static str,
    enc_type: i32,
    query_type: i32,
    port: u16,
    principals: &'static [GamespyPrincipal],
) -> GamespyGameConfig {
    GamespyGameConfig {
        game_name,
        game_key,
        enc_type,
        query_type,
        port,
        principals,
        list_type: None,
        info_query: None,
        links: LinkRefs::NONE,
    }
}

impl GamespyGame {
    pub fn config(self) -> GamespyGameConfig {
        use GamespyPrincipal as P;

        const UNREAL_PRINCIPALS: &[GamespyPrincipal] = &[
            P::ThreeThreeThreeNetworks1,
            P::OldUnreal1,
            P::ErroristEu,
            P::OpenSpy,
            P::Qtracker,
        ];

        match self {
            Self::Bf1942 => game(
                "bfield1942",
                "HpWx9z",
                2,
                0,
                28900,
                &[P::Bf1942Org, P::OpenSpy, P::Qtracker],
            ),
            Self::BfVietnam => game("bfvietnam", "h2P9dJ", 2, 0, 28900, &[P::OpenSpy, P::Qtracker]),
            Self::Bf2 => GamespyGameConfig {
                links: LinkRefs {
                    any: &["bf2.tv"],
                    by_principal: &[("bf2hub.com", &["bf2hub"])],
                },
                ..game(
                    "battlefield2",
                    "hW6m9a",
                    -1,
                    8,
                    28910,
                    &[P::Bf2Hub, P::OpenSpy, P::PhoenixNetwork, P::PlayBf2],
                )
            },
            Self::Fh2 => GamespyGameConfig {
                info_query: Some("\\hostname"),
                ..game("battlefield2", "hW6m9a", -1, 8, 28910, &[P::Fh2Dev])
            },
            Self::Bf2142 => game(
                "stella",
                "M8o1Qw",
                -1,
                8,
                28910,
                &[P::NovGames, P::OpenSpy, P::Play2142],
            ),
            Self::Crysis => game("crysis", "ZvZDcL", -1, 8, 28910, &[P::CrympNet]),
            Self::CrysisWars => game("crysiswars", "zKbZiM", -1, 8, 28910, &[P::Jedi95Us]),
            Self::JbNightfire => game("jbnightfire", "S9j3L2", -1, 0, 28910, &[P::OpenSpy, P::NightfirePc]),
            Self::Paraworld => game("paraworld", "EUZpQF", -1, 8, 28910, &[P::OpenSpy]),
            Self::Postal2 => game("postal2", "yw3R9c", 0, 0, 28900, &[P::ThreeThreeThreeNetworks1]),
            // The SWAT 4 principal returns nothing for list type 1, which
            // takes a patched gslist to change.
            Self::Swat4 => GamespyGameConfig {
                list_type: Some(0),
                info_query: Some("\\hostname"),
                links: LinkRefs {
                    any: &[],
                    by_principal: &[("swat4stats.com", &["swat4stats.com"])],
                },
                ..game("swat4", "tG3j8c", -1, 0, 28910, &[P::Swat4Stats])
            },
            Self::Unreal => game("unreal", "DAncRK", 0, 0, 28900, UNREAL_PRINCIPALS),
            Self::Ut => game("ut", "Z5Nfb0", 0, 0, 28900, UNREAL_PRINCIPALS),
            Self::Ut3 => game("ut3pc", "nT2Mtz", -1, 11, 28910, &[P::EpicGamesUt3]),
            Self::Vietcong => game(
                "vietcong",
                "bq98mE",
                2,
                0,
                28900,
                &[P::VietcongTk, P::Vietcong1Eu, P::Qtracker],
            ),
            Self::Vietcong2 => game("vietcong2", "zX2pq6", -1, 8, 28910, &[P::OpenSpy]),
        }
    }

    /// Whether query `keys` look like a server of this game. Some principals
    /// list servers of other games too.
    pub fn matches(self, keys: &BTreeMap<String, String>) -> bool {
        let has = |key: &str| keys.contains_key(key);
        let value = |key: &str| keys.get(key).map(String::as_str);
        match self {
            // No reliable game name, but a few unique keys
            Self::BfVietnam => {
                has("allow_nose_cam")
                    && has("name_tag_distance_scope")
                    && has("soldier_friendly_fire_on_splash")
                    && has("all_active_mods")
            }
            // Same keys as Crysis Wars, minus the game name
            Self::Crysis => has("voicecomm") && has("dx10") && has("gamepadsonly") && !has("gamename"),
            Self::Vietcong => has("uver") && has("dedic") && !has("extinfo"),
            Self::Vietcong2 => has("uver") && has("dedic") && has("extinfo"),
            // A Battlefield 2 mod
            Self::Fh2 => value("gamename") == Some(self.config().game_name) && value("gamevariant") == Some("fh2"),
            Self::Swat4 => matches!(value("gamevariant"), Some("SWAT 4" | "SWAT 4X" | "SEF" | "FR")),
            Self::Ut3 => has("p1073741825") && has("p1073741826"),
            _ => value("gamename").is_some_and(|name| name.to_lowercase() == self.config().game_name),
        }
    }
}

// ── Source ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GamespyOptions {
    pub gslist: Gslist,
    pub list_dir: PathBuf,
    pub filter: String,
    pub super_query: bool,
    pub verify: bool,
    pub add_links: bool,
}

pub struct GamespySource {
    game: GamespyGame,
    config: GamespyGameConfig,
    principal: GamespyPrincipal,
    options: GamespyOptions,
}

impl GamespySource {
    /// Without an explicit principal the game's default one is used.
    pub fn new(
        game: GamespyGame,
        principal: Option<GamespyPrincipal>,
        options: GamespyOptions,
    ) -> Result<Self, CoreError> {
        let config = game.config();
        let principal = match principal {
            Some(p) if config.principals.contains(&p) => p,
            Some(p) => {
                return Err(CoreError::Config {
                    message: format!("principal {p} is not available for {game}"),
                });
            }
            None => config.principals.first().copied().ok_or_else(|| {
                CoreError::Internal(format!("{game} has no principals"))
            })?,
        };
        Ok(Self {
            game,
            config,
            principal,
            options,
        })
    }

    pub fn principal(&self) -> GamespyPrincipal {
        self.principal
    }

    fn principal_address(&self) -> (String, u16) {
        let host = self
            .principal
            .hostname()
            .replace("{0}", self.config.game_name);
        (host, self.config.port + self.principal.port_offset())
    }

    async fn query(&self, ip: &str, port: u16) -> Option<BTreeMap<String, String>> {
        match self.options.gslist.query(self.config.query_type, ip, port).await {
            Ok(keys) => Some(keys),
            Err(e) => {
                debug!(ip, port, error = %e, "query did not receive a response");
                None
            }
        }
    }

    /// Inspect listed servers one at a time, in list order.
    async fn inspect_all(&self, entries: Vec<(Ipv4Addr, u16)>) -> Vec<ClassicServer> {
        let mut servers = Vec::with_capacity(entries.len());
        for (ip, port) in entries {
            if let Some(server) = self.inspect(ip, port).await {
                servers.push(server);
            }
        }
        servers
    }

    /// Query one listed server. `None` drops it.
    async fn inspect(&self, ip: Ipv4Addr, query_port: u16) -> Option<ClassicServer> {
        let mut server = classic_server(ip, query_port, self.principal.as_ref(), Vec::new());
        if !(self.options.verify || self.options.add_links) {
            return Some(server);
        }

        let Some(keys) = self.query(&server.ip, query_port).await else {
            return Some(server);
        };
        if self.options.verify && !self.game.matches(&keys) {
            warn!(ip = %server.ip, query_port, game = %self.game, "server does not seem to be for this game, ignoring it");
            return None;
        }
        if self.options.add_links {
            match keys.get("hostport").map(|p| p.parse::<u16>()) {
                Some(Ok(game_port)) => {
                    server.links = self.build_links(&server.guid, Some(&server.ip), Some(game_port));
                }
                Some(Err(_)) => warn!(
                    ip = %server.ip,
                    query_port,
                    "server returned an invalid hostport, not adding links"
                ),
                None => {}
            }
        }
        Some(server)
    }
}

/// Parse a `.gsl` list: one `ip:port` per line, optionally followed by more
/// columns.
pub fn parse_list(raw: &str) -> Vec<(Ipv4Addr, u16)> {
    raw.lines()
        .filter_map(|line| {
            let connect = line.split_whitespace().next()?;
            let (ip, port) = connect.split_once(':')?;
            checked_address(ip, port.parse().ok()?)
        })
        .collect()
}

impl Source for GamespySource {
    type Server = ClassicServer;

    fn name(&self) -> &str {
        self.principal.as_ref()
    }

    async fn fetch_candidates(&self) -> Result<Vec<ClassicServer>, CoreError> {
        let (host, port) = self.principal_address();
        // Resolved up front to spread retries across records
        let ips = resolve_host(&host, RESOLVE_TIMEOUT).await?;
        let (first, last) = match (ips.first(), ips.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(CoreError::Resolution { host }),
        };

        let gslist = &self.options.gslist;
        let list_dir = self.options.list_dir.as_path();
        let raw = retry("gslist", FETCH_ATTEMPTS, |attempt| {
            let ip = if attempt % 2 == 0 { first } else { last };
            let request = GslistListRequest {
                game_name: self.config.game_name,
                game_key: self.config.game_key,
                enc_type: self.config.enc_type,
                principal: format!("{ip}:{port}"),
                filter: &self.options.filter,
                list_type: self.config.list_type,
                info_query: self.config.info_query,
                super_query: self.options.super_query.then_some(self.config.query_type),
            };
            async move { gslist.list(&request, list_dir).await }
        })
        .await?;

        let entries = parse_list(&raw);
        info!(
            entries = entries.len(),
            verify = self.options.verify,
            "parsed server list"
        );

        Ok(self.inspect_all(entries).await)
    }

    /// A direct query cannot tell a failed check from a dead server, so the
    /// check itself always counts as completed.
    async fn check_existence(&self, server: &ClassicServer) -> ProbeOutcome {
        let Some(port) = server.query_port.get() else {
            return ProbeOutcome::NotFound;
        };
        match self.query(&server.ip, port).await {
            Some(keys) if !self.options.verify || self.game.matches(&keys) => ProbeOutcome::Found,
            Some(_) => {
                warn!(uid = %server.guid, game = %self.game, "server does not seem to be for this game, treating as not found");
                ProbeOutcome::NotFound
            }
            None => ProbeOutcome::NotFound,
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
