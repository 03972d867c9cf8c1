use serverlist_api::HttpClient;
use serverlist_api::http::GametoolsClient;
use serverlist_core::RunSummary;
use serverlist_core::sources::gametools::GametoolsSource;

use crate::cli::GametoolsArgs;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: GametoolsArgs, config: &Config) -> Result<RunSummary, CliError> {
    let http = HttpClient::new(&config::transport(Some(&args.http), config))?;
    let base = config::upstream_url("gametools", &config.upstream.gametools)?;
    let source = GametoolsSource::new(
        GametoolsClient::new(http, base),
        args.game,
        config::page_options(&args.http, config)?,
        config::add_links(&args.common, config),
        args.include_official,
    );

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    super::run(source, options).await
}
