// Quake3 directory protocol (`getservers`) and `getstatus` server queries
//
// Principal replies carry `\` separated 6-byte entries (IPv4 + big-endian
// port) and end with `\EOT\0\0\0`. UDP principals may split the list across
// several datagrams; TCP principals stream it and close.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::Buf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{MAX_DATAGRAM, RawServer, connect_udp, udp_exchange, within};
use crate::error::Error;

const OOB: &[u8] = b"\xff\xff\xff\xff";
const LIST_HEADER: &[u8] = b"getserversResponse";
const END_MARKER: &[u8] = b"\\EOT\0\0\0";
/// Whole UDP listings are cut off after this many per-datagram timeouts.
const LIST_DEADLINE_TIMEOUTS: u32 = 10;

/// Transport used by a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Udp,
    Tcp,
}

/// Status query dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusDialect {
    #[default]
    Quake3,
    /// Medal of Honor prefixes the command with `0x02`.
    MedalOfHonor,
}

/// A Quake3-style principal.
#[derive(Debug, Clone)]
pub struct Quake3Principal {
    host: String,
    port: u16,
    network: Network,
    timeout: Duration,
}

/// What to ask a principal for.
#[derive(Debug, Clone, Default)]
pub struct GetServersQuery<'a> {
    pub protocol: u32,
    /// Game name for shared (dpmaster-style) principals; empty otherwise.
    pub game_name: &'a str,
    pub keywords: &'a str,
    /// Bytes following the `\` separator before each entry.
    pub entry_prefix: &'a [u8],
}

impl GetServersQuery<'_> {
    fn request(&self) -> Vec<u8> {
        let mut request = OOB.to_vec();
        let command = if self.game_name.is_empty() {
            format!("getservers {} {}", self.protocol, self.keywords)
        } else {
            format!(
                "getservers {} {} {}",
                self.game_name, self.protocol, self.keywords
            )
        };
        request.extend_from_slice(command.as_bytes());
        request
    }
}

impl Quake3Principal {
    pub fn new(host: impl Into<String>, port: u16, network: Network, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            network,
            timeout,
        }
    }

    pub async fn get_servers(&self, query: &GetServersQuery<'_>) -> Result<Vec<RawServer>, Error> {
        debug!(host = %self.host, protocol = query.protocol, "querying quake3 principal");
        let payload = match self.network {
            Network::Udp => self.collect_udp(&query.request()).await?,
            Network::Tcp => self.collect_tcp(&query.request()).await?,
        };
        parse_server_list(&payload, query.entry_prefix)
    }

    async fn collect_udp(&self, request: &[u8]) -> Result<Vec<u8>, Error> {
        let socket = within(self.timeout, connect_udp(&self.host, self.port)).await?;
        socket.send(request).await?;

        // Per-datagram timeout, plus a cap on the whole listing for
        // principals that keep sending without an end marker
        let deadline = self.timeout.saturating_mul(LIST_DEADLINE_TIMEOUTS);
        within(deadline, async {
            let mut payload = Vec::new();
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match tokio::time::timeout(self.timeout, socket.recv(&mut buf)).await {
                    Ok(Ok(len)) => {
                        let datagram = buf.get(..len).unwrap_or_default();
                        trace!(len, "principal datagram");
                        payload.extend_from_slice(datagram);
                        if ends_list(datagram) {
                            break;
                        }
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    // Principals that omit the end marker simply stop sending.
                    Err(_) if !payload.is_empty() => break,
                    Err(_) => return Err(Error::timeout(self.timeout)),
                }
            }
            Ok(payload)
        })
        .await
    }

    async fn collect_tcp(&self, request: &[u8]) -> Result<Vec<u8>, Error> {
        within(self.timeout, async {
            let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
            stream.write_all(request).await?;
            let mut payload = Vec::new();
            let mut buf = vec![0u8; 8192];
            loop {
                let len = stream.read(&mut buf).await?;
                if len == 0 {
                    break;
                }
                payload.extend_from_slice(buf.get(..len).unwrap_or_default());
                if ends_list(&payload) {
                    break;
                }
            }
            Ok(payload)
        })
        .await
    }
}

fn ends_list(data: &[u8]) -> bool {
    data.windows(END_MARKER.len()).any(|w| w == END_MARKER)
}

/// Parse one or more concatenated `getserversResponse` packets.
pub fn parse_server_list(data: &[u8], entry_prefix: &[u8]) -> Result<Vec<RawServer>, Error> {
    if !data.windows(LIST_HEADER.len()).any(|w| w == LIST_HEADER) {
        return Err(Error::protocol("missing getserversResponse header"));
    }

    let mut separator = b"\\".to_vec();
    separator.extend_from_slice(entry_prefix);

    let mut servers = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        if rest.starts_with(END_MARKER) {
            break;
        }
        if rest.starts_with(OOB) {
            rest.advance(OOB.len());
            continue;
        }
        if rest.starts_with(LIST_HEADER) {
            rest.advance(LIST_HEADER.len());
            continue;
        }
        if rest.starts_with(&separator) && rest.len() >= separator.len() + 6 {
            rest.advance(separator.len());
            let ip = Ipv4Addr::new(rest.get_u8(), rest.get_u8(), rest.get_u8(), rest.get_u8());
            let port = rest.get_u16();
            servers.push(RawServer::new(ip, port));
            continue;
        }
        rest.advance(1);
    }
    Ok(servers)
}

/// Query a server's status and return its info keys.
pub async fn get_status(
    ip: &str,
    port: u16,
    dialect: StatusDialect,
    timeout: Duration,
) -> Result<BTreeMap<String, String>, Error> {
    let mut request = OOB.to_vec();
    if dialect == StatusDialect::MedalOfHonor {
        request.push(0x02);
    }
    request.extend_from_slice(b"getstatus");

    let reply = udp_exchange(ip, port, &request, timeout).await?;
    parse_status(&reply)
}

/// Parse a `statusResponse` into its `\key\value` info string.
pub fn parse_status(reply: &[u8]) -> Result<BTreeMap<String, String>, Error> {
    let text = String::from_utf8_lossy(reply);
    let (_, body) = text
        .split_once("statusResponse")
        .ok_or_else(|| Error::protocol("missing statusResponse header"))?;
    let info = body.trim_start_matches('\n').lines().next().unwrap_or_default();

    let mut parts = info.trim_start_matches('\\').split('\\');
    let mut keys = BTreeMap::new();
    while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
        keys.insert(key.to_owned(), value.to_owned());
    }
    Ok(keys)
}
