use std::time::Duration;

use serverlist_core::RunSummary;
use serverlist_core::sources::quake3::Quake3Source;

use crate::cli::Quake3Args;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: Quake3Args, config: &Config) -> Result<RunSummary, CliError> {
    let source = Quake3Source::new(
        args.game,
        &args.principal,
        Duration::from_secs(args.timeout),
        config::add_links(&args.common, config),
    )?;

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    super::run(source, options).await
}
