//! Command dispatch: bridges CLI args -> core sources -> one lister run.

pub mod battlelog;
pub mod bfbc2;
pub mod gamespy;
pub mod gametools;
pub mod medalofhonor;
pub mod quake3;
pub mod unreal2;
pub mod valve;

use std::sync::Arc;

use serverlist_api::tools::Gamedig;
use serverlist_core::{Lister, ListerOptions, QueryPortSource, RunSummary, Source};

use crate::cli::Command;
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a list subcommand to its handler.
pub async fn dispatch(cmd: Command, config: &Config) -> Result<RunSummary, CliError> {
    match cmd {
        Command::Battlelog(args) => battlelog::handle(args, config).await,
        Command::Bfbc2(args) => bfbc2::handle(args, config).await,
        Command::Gametools(args) => gametools::handle(args, config).await,
        Command::Gamespy(args) => gamespy::handle(args, config).await,
        Command::Medalofhonor(args) => medalofhonor::handle(args, config).await,
        Command::Quake3(args) => quake3::handle(args, config).await,
        Command::Unreal2(args) => unreal2::handle(args, config).await,
        Command::Valve(args) => valve::handle(args, config).await,
        Command::Completions(_) => Err(CliError::Internal(
            "completions are generated before dispatch".into(),
        )),
    }
}

/// Load, update, sweep, save.
pub(crate) async fn run<S: Source>(source: S, options: ListerOptions) -> Result<RunSummary, CliError> {
    let mut lister = Lister::open(source, options)?;
    Ok(lister.run().await?)
}

/// Like [`run`], with query port discovery between update and sweep.
pub(crate) async fn run_with_query_ports<S: QueryPortSource>(
    source: S,
    options: ListerOptions,
    tool: Option<(Gamedig, usize)>,
) -> Result<RunSummary, CliError> {
    let Some((gamedig, concurrency)) = tool else {
        return run(source, options).await;
    };
    let mut lister = Lister::open(source, options)?;
    lister.update().await?;
    lister.find_query_ports(Arc::new(gamedig), concurrency).await;
    lister.remove_expired().await;
    lister.save()?;
    Ok(lister.log_summary())
}
