//! Clap derive structures for the `serverlist` CLI.
//!
//! One subcommand per source family. Options that have a config file
//! counterpart are `Option`s here so an explicit flag can be told apart
//! from the configured default.

use std::path::PathBuf;
use std::str::FromStr;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Args, Parser, Subcommand};
use serverlist_core::sources::battlelog::BattlelogGame;
use serverlist_core::sources::gamespy::{GamespyGame, GamespyPrincipal};
use serverlist_core::sources::gametools::GametoolsGame;
use serverlist_core::sources::medalofhonor::MedalOfHonorGame;
use serverlist_core::sources::quake3::Quake3Game;
use serverlist_core::sources::unreal2::Unreal2Game;
use serverlist_core::sources::valve::{ValveGame, ValvePrincipalName};
use strum::VariantNames;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// serverlist -- keep game server lists in step with their master servers
#[derive(Debug, Parser)]
#[command(
    name = "serverlist",
    version,
    about = "Maintain persisted lists of game servers",
    long_about = "Fetches the servers a principal (master server) currently advertises,\n\
        merges them into a JSON list file and drops servers that have been gone\n\
        for longer than the expiry TTL.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "SERVERLIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Battlefield 3, 4 and Hardline servers via Battlelog
    Battlelog(BattlelogArgs),

    /// Battlefield: Bad Company 2 servers via the FESL theater backend
    Bfbc2(Bfbc2Args),

    /// Battlefield 1 and V servers via gametools.network
    Gametools(GametoolsArgs),

    /// GameSpy-era servers via gslist
    Gamespy(GamespyArgs),

    /// Medal of Honor servers via mohaaservers.tk
    #[command(alias = "moh")]
    Medalofhonor(MedalOfHonorArgs),

    /// Quake3-engine servers via dpmaster-style principals
    Quake3(Quake3Args),

    /// Unreal Tournament 2003/2004 servers via Unreal2 principals
    Unreal2(Unreal2Args),

    /// Source and GoldSrc servers via the Valve master server
    Valve(ValveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// The options shared by every list subcommand.
    pub fn common(&self) -> Option<&CommonArgs> {
        match self {
            Self::Battlelog(args) => Some(&args.common),
            Self::Bfbc2(args) => Some(&args.common),
            Self::Gametools(args) => Some(&args.common),
            Self::Gamespy(args) => Some(&args.common),
            Self::Medalofhonor(args) => Some(&args.common),
            Self::Quake3(args) => Some(&args.common),
            Self::Unreal2(args) => Some(&args.common),
            Self::Valve(args) => Some(&args.common),
            Self::Completions(_) => None,
        }
    }
}

// ── Shared Argument Groups ───────────────────────────────────────────

/// Options every list subcommand takes.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Hours after which a server no longer seen upstream expires
    #[arg(long, short = 'e')]
    pub expired_ttl: Option<f64>,

    /// Directory holding the list files
    #[arg(long, short = 'd')]
    pub list_dir: Option<PathBuf>,

    /// Drop expired servers without checking whether they still exist
    #[arg(long)]
    pub no_recover: bool,

    /// Attach web links (server browsers, stats sites) to each server
    #[arg(long)]
    pub add_links: bool,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,
}

/// Options of the paginated HTTP browse APIs.
#[derive(Debug, Args)]
pub struct HttpArgs {
    /// Stop after this many pages in a row without a new server
    #[arg(long, short = 'p')]
    pub page_limit: Option<u32>,

    /// Base of the exponential sleep between page requests, in seconds
    #[arg(long)]
    pub sleep: Option<f64>,

    /// Stop after this many failed page requests in a row
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Proxy for https requests
    #[arg(long)]
    pub proxy: Option<url::Url>,
}

/// Options of query port discovery.
#[derive(Debug, Args)]
pub struct QueryPortArgs {
    /// Find each server's query port with gamedig
    #[arg(long)]
    pub find_query_port: bool,

    /// Path to the gamedig executable
    #[arg(long)]
    pub gamedig_bin: Option<PathBuf>,

    /// Number of gamedig processes run at once
    #[arg(long)]
    pub gamedig_concurrency: Option<usize>,
}

// ── Subcommand Arguments ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BattlelogArgs {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<BattlelogGame>())]
    pub game: BattlelogGame,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub http: HttpArgs,

    #[command(flatten)]
    pub query_port: QueryPortArgs,
}

#[derive(Debug, Args)]
pub struct Bfbc2Args {
    /// Request timeout in seconds
    #[arg(long, short = 't', default_value_t = 10)]
    pub timeout: u64,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub query_port: QueryPortArgs,
}

#[derive(Debug, Args)]
pub struct GametoolsArgs {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<GametoolsGame>())]
    pub game: GametoolsGame,

    /// Keep official (publisher-run) servers in the list
    #[arg(long)]
    pub include_official: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(Debug, Args)]
pub struct GamespyArgs {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<GamespyGame>())]
    pub game: GamespyGame,

    /// Principal to query (defaults to the game's first one)
    #[arg(long, short = 'p', value_parser = one_of::<GamespyPrincipal>())]
    pub principal: Option<GamespyPrincipal>,

    /// Path to the gslist executable
    #[arg(long, short = 'b')]
    pub gslist: Option<PathBuf>,

    /// gslist server filter
    #[arg(long, short = 'f', default_value = "")]
    pub filter: String,

    /// Have gslist query each server for its info
    #[arg(long, short = 's')]
    pub super_query: bool,

    /// Seconds before a gslist invocation is killed
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,

    /// Query each server and keep only those whose reply matches the game
    #[arg(long)]
    pub verify: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct MedalOfHonorArgs {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<MedalOfHonorGame>())]
    pub game: MedalOfHonorGame,

    /// Status query timeout in seconds
    #[arg(long, short = 't', default_value_t = 5)]
    pub timeout: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct Quake3Args {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<Quake3Game>())]
    pub game: Quake3Game,

    /// Principal to query
    #[arg(long, short = 'p')]
    pub principal: String,

    /// Principal timeout in seconds
    #[arg(long, short = 't', default_value_t = 5)]
    pub timeout: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct Unreal2Args {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<Unreal2Game>())]
    pub game: Unreal2Game,

    /// Principal to query
    #[arg(long, short = 'p')]
    pub principal: String,

    /// CD key used in the principal handshake
    #[arg(long, short = 'c', env = "SERVERLIST_CD_KEY", hide_env_values = true)]
    pub cd_key: Option<String>,

    /// Principal and server timeout in seconds
    #[arg(long, short = 't', default_value_t = 5)]
    pub timeout: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct ValveArgs {
    /// Game to list servers for
    #[arg(long, short = 'g', value_parser = one_of::<ValveGame>())]
    pub game: ValveGame,

    /// Principal to query (defaults to the game's first one)
    #[arg(long, short = 'p', value_parser = one_of::<ValvePrincipalName>())]
    pub principal: Option<ValvePrincipalName>,

    /// Extra master server filter, appended to the app id filter
    #[arg(long, short = 'f', default_value = "")]
    pub filter: String,

    /// Principal and server timeout in seconds
    #[arg(long, short = 't', default_value_t = 5)]
    pub timeout: u64,

    /// Pages to request per region before giving up
    #[arg(long, short = 'm', default_value_t = 10)]
    pub max_pages: u32,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Accept exactly the names a strum enum serializes to.
fn one_of<T>() -> impl TypedValueParser<Value = T>
where
    T: VariantNames + FromStr + Clone + Send + Sync + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    PossibleValuesParser::new(T::VARIANTS).try_map(|name| name.parse::<T>())
}
