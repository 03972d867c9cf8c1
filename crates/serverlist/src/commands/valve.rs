use std::time::Duration;

use serverlist_core::RunSummary;
use serverlist_core::sources::valve::{ValveOptions, ValveSource};

use crate::cli::ValveArgs;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: ValveArgs, config: &Config) -> Result<RunSummary, CliError> {
    let source = ValveSource::new(
        args.game,
        args.principal,
        ValveOptions {
            filter: args.filter,
            max_pages: args.max_pages,
            timeout: Duration::from_secs(args.timeout),
            add_links: config::add_links(&args.common, config),
        },
    )?;

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    super::run(source, options).await
}
