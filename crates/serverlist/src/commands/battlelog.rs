use serverlist_api::HttpClient;
use serverlist_api::http::BattlelogClient;
use serverlist_core::RunSummary;
use serverlist_core::sources::battlelog::BattlelogSource;

use crate::cli::BattlelogArgs;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: BattlelogArgs, config: &Config) -> Result<RunSummary, CliError> {
    let http = HttpClient::new(&config::transport(Some(&args.http), config))?;
    let base = config::upstream_url("battlelog", &config.upstream.battlelog)?;
    let source = BattlelogSource::new(
        BattlelogClient::new(http, base),
        args.game,
        config::page_options(&args.http, config)?,
        config::add_links(&args.common, config),
    );

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    let tool = config::query_port_tool(&args.query_port, config)?;
    super::run_with_query_ports(source, options, tool).await
}
