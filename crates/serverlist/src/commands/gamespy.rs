use std::time::Duration;

use serverlist_api::tools::Gslist;
use serverlist_core::RunSummary;
use serverlist_core::sources::gamespy::{GamespyOptions, GamespySource};
use tracing::info;

use crate::cli::GamespyArgs;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: GamespyArgs, config: &Config) -> Result<RunSummary, CliError> {
    let bin = args
        .gslist
        .clone()
        .or_else(|| config.gamespy.gslist_bin.clone())
        .ok_or_else(|| CliError::Validation {
            field: "gslist".into(),
            reason: "no gslist executable given, pass --gslist or set gamespy.gslist_bin".into(),
        })?;
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.gamespy.timeout));

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    let source = GamespySource::new(
        args.game,
        args.principal,
        GamespyOptions {
            gslist: Gslist::new(bin, timeout),
            list_dir: options.list_dir.clone(),
            filter: args.filter,
            super_query: args.super_query,
            verify: args.verify,
            add_links: config::add_links(&args.common, config),
        },
    )?;
    info!(game = %args.game, principal = %source.principal(), "listing gamespy servers");

    super::run(source, options).await
}
