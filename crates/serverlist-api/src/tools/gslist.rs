// gslist, the GameSpy master server and server query tool
//
// gslist writes everything human-readable to stderr and the list itself
// to `<gamename>.gsl` in its working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use super::{latin1, run};
use crate::error::Error;

/// Extra time granted when gslist also queries every listed server.
const SUPER_QUERY_GRACE: Duration = Duration::from_secs(10);

/// Parameters of a single master server list request.
#[derive(Debug, Clone)]
pub struct GslistListRequest<'a> {
    pub game_name: &'a str,
    pub game_key: &'a str,
    pub enc_type: i32,
    /// `ip:port` of the principal.
    pub principal: String,
    pub filter: &'a str,
    pub list_type: Option<i32>,
    pub info_query: Option<&'a str>,
    /// Query type to use for a super query (`-Q`).
    pub super_query: Option<i32>,
}

impl GslistListRequest<'_> {
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-n".to_owned(),
            self.game_name.to_owned(),
            "-x".to_owned(),
            self.principal.clone(),
            "-Y".to_owned(),
            self.game_name.to_owned(),
            self.game_key.to_owned(),
            "-t".to_owned(),
            self.enc_type.to_string(),
            "-f".to_owned(),
            self.filter.to_owned(),
            "-o".to_owned(),
            "1".to_owned(),
        ];
        if let Some(list_type) = self.list_type {
            args.extend(["-T".to_owned(), list_type.to_string()]);
        }
        if let Some(info_query) = self.info_query {
            args.extend(["-X".to_owned(), info_query.to_owned()]);
        }
        if let Some(query_type) = self.super_query {
            args.extend(["-Q".to_owned(), query_type.to_string()]);
        }
        args
    }
}

#[derive(Debug, Clone)]
pub struct Gslist {
    bin: PathBuf,
    timeout: Duration,
}

impl Gslist {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Fetch a server list from a principal and return the raw list file.
    pub async fn list(&self, request: &GslistListRequest<'_>, list_dir: &Path) -> Result<String, Error> {
        let timeout = if request.super_query.is_some() {
            self.timeout + SUPER_QUERY_GRACE
        } else {
            self.timeout
        };
        info!(principal = %request.principal, "running gslist");
        let output = run(&self.bin, &request.args(), Some(list_dir), timeout).await?;

        let stderr = latin1(&output.stderr);
        if !stderr.contains("servers found") {
            return Err(Error::Subprocess {
                program: "gslist".into(),
                message: "no servers found".into(),
            });
        }

        let path = list_dir.join(format!("{}.gsl", request.game_name));
        Ok(std::fs::read_to_string(path)?)
    }

    /// Query a single server and return its key/value pairs (keys lowercased).
    pub async fn query(
        &self,
        query_type: i32,
        ip: &str,
        port: u16,
    ) -> Result<BTreeMap<String, String>, Error> {
        let args = [
            "-d".to_owned(),
            query_type.to_string(),
            ip.to_owned(),
            port.to_string(),
            "-0".to_owned(),
        ];
        let output = run(&self.bin, &args, None, self.timeout).await?;

        // gslist prints nothing at all for unreachable servers
        if output.stdout.is_empty() || latin1(&output.stderr).to_lowercase().contains("error") {
            debug!(ip, port, "server did not answer query");
            return Err(Error::Subprocess {
                program: "gslist".into(),
                message: format!("no response from {ip}:{port}"),
            });
        }

        Ok(parse_key_values(&latin1(&output.stdout)))
    }
}

/// Parse `key value` lines, lowercasing keys and skipping lines without a value.
pub fn parse_key_values(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.trim_start().split_once(' ')?;
            Some((key.to_lowercase(), value.to_owned()))
        })
        .collect()
}
