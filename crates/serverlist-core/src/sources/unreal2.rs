// ── Unreal Engine 2 principals (ut2003, ut2004) ──

use std::time::Duration;

use secrecy::SecretString;
use serverlist_api::principal::unreal2::{self, ClientIdentity, Unreal2Principal};
use strum::{AsRefStr, Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, info};

use super::{FETCH_ATTEMPTS, checked_address, classic_server, retry};
use crate::error::CoreError;
use crate::model::ClassicServer;
use crate::source::{ProbeOutcome, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Unreal2Game {
    Ut2003,
    Ut2004,
}

/// name, hostname, port
type PrincipalEntry = (&'static str, &'static str, u16);

const OPENSPY: PrincipalEntry = ("openspy.net", "utmaster.openspy.net", 28902);

impl Unreal2Game {
    pub fn principals(self) -> &'static [PrincipalEntry] {
        match self {
            Self::Ut2003 => &[OPENSPY],
            Self::Ut2004 => &[("epicgames.com", "ut2004master1.epicgames.com", 28902), OPENSPY],
        }
    }

    pub fn identity(self) -> ClientIdentity {
        match self {
            Self::Ut2003 => ClientIdentity::UT2003,
            Self::Ut2004 => ClientIdentity::UT2004,
        }
    }
}

pub struct Unreal2Source {
    principal_name: &'static str,
    principal: Unreal2Principal,
    timeout: Duration,
}

impl Unreal2Source {
    pub fn new(
        game: Unreal2Game,
        principal: &str,
        cd_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let Some(&(name, host, port)) = game.principals().iter().find(|(name, ..)| *name == principal) else {
            return Err(CoreError::Config {
                message: format!("principal {principal} is not available for {game}"),
            });
        };
        Ok(Self {
            principal_name: name,
            principal: Unreal2Principal::new(host, port, game.identity(), cd_key, timeout),
            timeout,
        })
    }
}

impl Source for Unreal2Source {
    type Server = ClassicServer;

    fn name(&self) -> &str {
        self.principal_name
    }

    async fn fetch_candidates(&self) -> Result<Vec<ClassicServer>, CoreError> {
        let raw = retry(self.name(), FETCH_ATTEMPTS, |_| self.principal.get_servers()).await?;
        info!(entries = raw.len(), principal = self.principal_name, "principal answered");

        let servers = raw
            .into_iter()
            .filter_map(|entry| {
                let (ip, port) = checked_address(&entry.ip.to_string(), i64::from(entry.query_port))?;
                Some(classic_server(ip, port, self.principal_name, Vec::new()))
            })
            .collect();
        Ok(servers)
    }

    async fn check_existence(&self, server: &ClassicServer) -> ProbeOutcome {
        let Some(port) = server.query_port.get() else {
            return ProbeOutcome::NotFound;
        };
        match unreal2::query_info(&server.ip, port, self.timeout).await {
            Ok(_) => ProbeOutcome::Found,
            Err(e) => {
                debug!(uid = %server.guid, error = %e, "failed to query server for expiration check");
                ProbeOutcome::NotFound
            }
        }
    }
}
