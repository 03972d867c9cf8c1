//! Binary principal (master server) and server query protocols.
//!
//! Each family exposes the same two capabilities: listing raw `(ip, port)`
//! candidates from a principal, and a direct status query against one
//! server. Timeouts surface as [`Error::Timeout`], malformed replies as
//! [`Error::Protocol`].

pub mod quake3;
pub mod unreal2;
pub mod valve;

use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::Error;

/// Largest datagram any of the supported protocols sends.
pub(crate) const MAX_DATAGRAM: usize = 65_507;

/// One server as listed by a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawServer {
    pub ip: Ipv4Addr,
    pub query_port: u16,
    /// Only some principals report the connect port separately.
    pub game_port: Option<u16>,
}

impl RawServer {
    pub fn new(ip: Ipv4Addr, query_port: u16) -> Self {
        Self {
            ip,
            query_port,
            game_port: None,
        }
    }
}

/// Await `fut`, mapping an elapsed `timeout` to [`Error::Timeout`].
pub(crate) async fn within<T, F>(timeout: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::timeout(timeout))?
}

/// A UDP socket connected to `host:port`.
pub(crate) async fn connect_udp(host: &str, port: u16) -> Result<UdpSocket, Error> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect((host, port)).await?;
    Ok(socket)
}

/// Send one datagram and wait for one reply.
pub(crate) async fn udp_exchange(
    host: &str,
    port: u16,
    request: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, Error> {
    within(timeout, async {
        let socket = connect_udp(host, port).await?;
        socket.send(request).await?;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let len = socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok(buf)
    })
    .await
}

/// Read a NUL-terminated string, lossily decoded.
pub(crate) fn read_cstring(buf: &mut &[u8]) -> Result<String, Error> {
    let data = *buf;
    let end = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::protocol("unterminated string"))?;
    let (head, tail) = data.split_at(end);
    let s = String::from_utf8_lossy(head).into_owned();
    *buf = tail.get(1..).unwrap_or_default();
    Ok(s)
}
