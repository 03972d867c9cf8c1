// gamedig, used to probe Frostbite servers for their query port

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use super::run;
use crate::error::Error;

/// Parsed gamedig JSON output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamedigResponse(Map<String, Value>);

impl GamedigResponse {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// A top-level string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn connect(&self) -> Option<&str> {
        self.get_str("connect")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }
}

#[derive(Debug, Clone)]
pub struct Gamedig {
    bin: PathBuf,
    timeout: Duration,
}

impl Gamedig {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Query `ip:port` as `game_type`, only ever on the given port.
    pub async fn query(&self, game_type: &str, ip: &str, port: u16) -> Result<GamedigResponse, Error> {
        let args = [
            "--type".to_owned(),
            game_type.to_owned(),
            format!("{ip}:{port}"),
            "--maxAttempts".to_owned(),
            "2".to_owned(),
            "--socketTimeout".to_owned(),
            "2000".to_owned(),
            "--givenPortOnly".to_owned(),
        ];
        let output = run(&self.bin, &args, None, self.timeout).await?;

        if !output.stderr.is_empty() || output.stdout.is_empty() {
            return Err(Error::Subprocess {
                program: "gamedig".into(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let parsed: Map<String, Value> = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::Deserialization {
                message: e.to_string(),
                body: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        })?;

        let response = GamedigResponse(parsed);
        if let Some(error) = response.get_str("error") {
            if error.starts_with("Failed all") {
                debug!(ip, port, error, "gamedig query failed");
                return Err(Error::protocol(error));
            }
        }
        Ok(response)
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::test_support::script;

    #[tokio::test]
    async fn parses_successful_query() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            &dir,
            "gamedig",
            "echo '{\"name\":\"Test Server\",\"connect\":\"1.2.3.4:25200\"}'\n",
        );
        let gamedig = Gamedig::new(bin, Duration::from_secs(5));

        let resp = gamedig.query("bf4", "1.2.3.4", 47200).await.unwrap();
        assert_eq!(resp.connect(), Some("1.2.3.4:25200"));
        assert_eq!(resp.name(), Some("Test Server"));
    }

    #[tokio::test]
    async fn passes_address_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(&dir, "gamedig", "printf '{\"args\":\"%s\"}' \"$*\"\n");
        let gamedig = Gamedig::new(bin, Duration::from_secs(5));

        let resp = gamedig.query("bf4", "1.2.3.4", 47200).await.unwrap();
        assert_eq!(
            resp.get_str("args"),
            Some("--type bf4 1.2.3.4:47200 --maxAttempts 2 --socketTimeout 2000 --givenPortOnly")
        );
    }

    #[tokio::test]
    async fn failed_all_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            &dir,
            "gamedig",
            "echo '{\"error\":\"Failed all 2 attempts\"}'\n",
        );
        let gamedig = Gamedig::new(bin, Duration::from_secs(5));

        let result = gamedig.query("bf4", "1.2.3.4", 47200).await;
        assert!(matches!(result, Err(Error::Protocol { .. })));
    }

    #[tokio::test]
    async fn stderr_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(&dir, "gamedig", "echo '{}'\necho boom >&2\n");
        let gamedig = Gamedig::new(bin, Duration::from_secs(5));

        let result = gamedig.query("bf4", "1.2.3.4", 47200).await;
        assert!(matches!(result, Err(Error::Subprocess { .. })));
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(&dir, "gamedig", "sleep 5\n");
        let gamedig = Gamedig::new(bin, Duration::from_millis(200));

        let result = gamedig.query("bf4", "1.2.3.4", 47200).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
