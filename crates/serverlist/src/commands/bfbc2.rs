use std::time::Duration;

use serverlist_api::HttpClient;
use serverlist_api::http::FeslClient;
use serverlist_core::RunSummary;
use serverlist_core::sources::bfbc2::{Bfbc2Source, GAME};

use crate::cli::Bfbc2Args;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: Bfbc2Args, config: &Config) -> Result<RunSummary, CliError> {
    let mut transport = config::transport(None, config);
    transport.timeout = Duration::from_secs(args.timeout);
    let http = HttpClient::new(&transport)?;
    let base = config::upstream_url("fesl", &config.upstream.fesl)?;
    let source = Bfbc2Source::new(FeslClient::new(http, base));

    let options = config::lister_options(&args.common, config, GAME)?;
    let tool = config::query_port_tool(&args.query_port, config)?;
    super::run_with_query_ports(source, options, tool).await
}
