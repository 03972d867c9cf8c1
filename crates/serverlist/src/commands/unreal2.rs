use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serverlist_core::RunSummary;
use serverlist_core::sources::unreal2::Unreal2Source;

use crate::cli::Unreal2Args;
use crate::config::{self, Config};
use crate::error::CliError;

pub async fn handle(args: Unreal2Args, config: &Config) -> Result<RunSummary, CliError> {
    // Flag (or its env var) first, then the config file
    let cd_key = match (args.cd_key, config.unreal2.cd_key.as_ref()) {
        (Some(key), _) => SecretString::from(key),
        (None, Some(key)) => SecretString::from(key.expose_secret().to_owned()),
        (None, None) => {
            return Err(CliError::Validation {
                field: "cd-key".into(),
                reason: "the principal handshake needs a CD key, pass --cd-key or set unreal2.cd_key".into(),
            });
        }
    };

    let source = Unreal2Source::new(
        args.game,
        &args.principal,
        cd_key,
        Duration::from_secs(args.timeout),
    )?;

    let options = config::lister_options(&args.common, config, args.game.as_ref())?;
    super::run(source, options).await
}
