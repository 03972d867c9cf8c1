mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(
        cli.global.verbose,
        cli.command.common().is_some_and(|common| common.debug),
    );

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` count or `--debug` picks the level.
fn init_tracing(verbosity: u8, debug: bool) {
    let filter = match (verbosity, debug) {
        (0, false) => "info",
        (0 | 1, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Completions(args) = cli.command {
        use clap::CommandFactory;
        use clap_complete::generate;

        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "serverlist", &mut std::io::stdout());
        return Ok(());
    }

    let config = config::load_config(cli.global.config.as_deref())?;
    commands::dispatch(cli.command, &config).await?;
    Ok(())
}
