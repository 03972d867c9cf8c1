use std::time::Duration;

use serverlist_api::HttpClient;
use serverlist_api::http::MohaaServersClient;
use serverlist_core::RunSummary;
use serverlist_core::sources::medalofhonor::MedalOfHonorSource;

use crate::cli::MedalOfHonorArgs;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: MedalOfHonorArgs, config: &Config) -> Result<RunSummary, CliError> {
    let http = HttpClient::new(&config::transport(None, config))?;
    let base = config::upstream_url("mohaaservers", &config.upstream.mohaaservers)?;
    let source = MedalOfHonorSource::new(
        MohaaServersClient::new(http, base),
        args.game,
        Duration::from_secs(args.timeout),
    );

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    super::run(source, options).await
}
