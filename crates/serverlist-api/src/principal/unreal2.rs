// Unreal Engine 2 principal (master server) and server info queries
//
// The principal speaks a framed TCP protocol: every message is a u32 LE
// length followed by the payload. Strings are Unreal `FString`s, a compact
// index length (including the terminating NUL) followed by the bytes. A
// negative length marks a UCS-2 string.

use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{Buf, BufMut};
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{RawServer, udp_exchange, within};
use crate::error::Error;

const MAX_FRAME: u32 = 64 * 1024;
const APPROVED: &str = "APPROVED";
const VERIFIED: &str = "VERIFIED";
const LANGUAGE: &str = "int";
const INFO_REQUEST: &[u8] = b"\x79\x00\x00\x00\x00";

/// How the client identifies itself during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: &'static str,
    pub version: u32,
}

impl ClientIdentity {
    pub const UT2003: Self = Self {
        name: "UT2K3CLIENT",
        version: 2225,
    };
    pub const UT2004: Self = Self {
        name: "UT2K4CLIENT",
        version: 3369,
    };
}

#[derive(Debug, Clone)]
pub struct Unreal2Principal {
    host: String,
    port: u16,
    identity: ClientIdentity,
    cd_key: SecretString,
    timeout: Duration,
}

impl Unreal2Principal {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity: ClientIdentity,
        cd_key: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity,
            cd_key,
            timeout,
        }
    }

    /// Authenticate and download the full server list.
    pub async fn get_servers(&self) -> Result<Vec<RawServer>, Error> {
        within(self.timeout, async {
            let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;

            let challenge = read_frame(&mut stream).await?;
            let challenge = read_fstring(&mut challenge.as_slice())?;
            trace!(%challenge, "received principal challenge");

            write_frame(&mut stream, &self.auth_packet(&challenge)).await?;
            expect_reply(&mut stream, APPROVED).await?;

            let mut verification = Vec::new();
            verification.put_u32_le(0);
            write_frame(&mut stream, &verification).await?;
            expect_reply(&mut stream, VERIFIED).await?;

            // query type 0 (server list) with no filters
            write_frame(&mut stream, &[0, 0]).await?;
            let header = read_frame(&mut stream).await?;
            let mut header = header.as_slice();
            if header.remaining() < 4 {
                return Err(Error::protocol("truncated server list header"));
            }
            let count = header.get_u32_le();
            debug!(host = %self.host, count, "principal announced servers");

            let mut servers = Vec::new();
            for _ in 0..count {
                let entry = read_frame(&mut stream).await?;
                servers.push(parse_server_entry(&entry)?);
            }
            Ok(servers)
        })
        .await
    }

    fn auth_packet(&self, challenge: &str) -> Vec<u8> {
        let cd_key = self.cd_key.expose_secret();
        let mut packet = Vec::new();
        put_fstring(&mut packet, &md5_hex(cd_key));
        put_fstring(&mut packet, &md5_hex(&format!("{cd_key}{challenge}")));
        put_fstring(&mut packet, self.identity.name);
        packet.put_u32_le(self.identity.version);
        // platform: windows
        packet.put_u8(0);
        put_fstring(&mut packet, LANGUAGE);
        // gpu device id, gpu vendor id, cpu speed, cpu type
        packet.put_u32_le(0);
        packet.put_u32_le(0);
        packet.put_u32_le(0);
        packet.put_u8(0);
        packet
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, Error> {
    let len = stream.read_u32_le().await?;
    if len > MAX_FRAME {
        return Err(Error::protocol(format!("frame of {len} bytes exceeds limit")));
    }
    let mut payload = vec![0u8; usize::try_from(len).unwrap_or_default()];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}

async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> Result<(), Error> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::protocol("frame too large"))?;
    stream.write_u32_le(len).await?;
    stream.write_all(payload).await?;
    Ok(())
}

async fn expect_reply(stream: &mut TcpStream, expected: &str) -> Result<(), Error> {
    let frame = read_frame(stream).await?;
    let reply = read_fstring(&mut frame.as_slice())?;
    if reply == expected {
        Ok(())
    } else {
        Err(Error::protocol(format!(
            "principal replied {reply:?}, expected {expected}"
        )))
    }
}

/// Parse one server entry: IPv4 in network order, game port and query port
/// (both u16 LE), followed by name/map/game type strings we do not need.
pub fn parse_server_entry(entry: &[u8]) -> Result<RawServer, Error> {
    let mut rest = entry;
    if rest.remaining() < 8 {
        return Err(Error::protocol("truncated server entry"));
    }
    let ip = Ipv4Addr::new(rest.get_u8(), rest.get_u8(), rest.get_u8(), rest.get_u8());
    let game_port = rest.get_u16_le();
    let query_port = rest.get_u16_le();
    Ok(RawServer {
        ip,
        query_port,
        game_port: Some(game_port),
    })
}

/// Ask a server for its basic info. Any reply means the server is up.
pub async fn query_info(ip: &str, port: u16, timeout: Duration) -> Result<Vec<u8>, Error> {
    let reply = udp_exchange(ip, port, INFO_REQUEST, timeout).await?;
    if reply.is_empty() {
        return Err(Error::protocol("empty info reply"));
    }
    Ok(reply)
}

// ── FString codec ───────────────────────────────────────────────────

pub fn put_compact_index(buf: &mut Vec<u8>, value: i32) {
    let mut magnitude = value.unsigned_abs();
    let mut first = u8::try_from(magnitude & 0x3f).unwrap_or_default();
    if value < 0 {
        first |= 0x80;
    }
    magnitude >>= 6;
    if magnitude > 0 {
        first |= 0x40;
    }
    buf.put_u8(first);
    while magnitude > 0 {
        let mut byte = u8::try_from(magnitude & 0x7f).unwrap_or_default();
        magnitude >>= 7;
        if magnitude > 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
    }
}

pub fn read_compact_index(buf: &mut &[u8]) -> Result<i32, Error> {
    let truncated = || Error::protocol("truncated compact index");
    if !buf.has_remaining() {
        return Err(truncated());
    }
    let first = buf.get_u8();
    let negative = first & 0x80 != 0;
    let mut value = u32::from(first & 0x3f);
    let mut more = first & 0x40 != 0;
    let mut shift = 6;
    while more {
        if !buf.has_remaining() || shift > 27 {
            return Err(truncated());
        }
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7f) << shift;
        more = byte & 0x80 != 0;
        shift += 7;
    }
    let value =
        i32::try_from(value).map_err(|_| Error::protocol("compact index out of range"))?;
    Ok(if negative { -value } else { value })
}

pub fn put_fstring(buf: &mut Vec<u8>, value: &str) {
    let len = i32::try_from(value.len() + 1).unwrap_or(i32::MAX);
    put_compact_index(buf, len);
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

pub fn read_fstring(buf: &mut &[u8]) -> Result<String, Error> {
    let len = read_compact_index(buf)?;
    let truncated = || Error::protocol("truncated string");
    let chars = usize::try_from(len.unsigned_abs()).map_err(|_| truncated())?;

    if len < 0 {
        let byte_len = chars * 2;
        if buf.remaining() < byte_len {
            return Err(truncated());
        }
        let units: Vec<u16> = (0..chars).map(|_| buf.get_u16_le()).collect();
        let text = String::from_utf16_lossy(&units);
        return Ok(text.trim_end_matches('\0').to_owned());
    }

    let data = *buf;
    if data.len() < chars {
        return Err(truncated());
    }
    let (head, tail) = data.split_at(chars);
    let text = String::from_utf8_lossy(head)
        .trim_end_matches('\0')
        .to_owned();
    *buf = tail;
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn compact_index_boundaries() {
        for value in [0, 1, 63, 64, 8191, 8192, 1_000_000, -1, -64, i32::MAX] {
            let mut buf = Vec::new();
            put_compact_index(&mut buf, value);
            let mut slice = buf.as_slice();
            assert_eq!(read_compact_index(&mut slice).unwrap(), value, "value {value}");
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn small_compact_index_is_one_byte() {
        let mut buf = Vec::new();
        put_compact_index(&mut buf, 9);
        assert_eq!(buf, [9]);
    }

    #[test]
    fn fstring_includes_terminator() {
        let mut buf = Vec::new();
        put_fstring(&mut buf, "int");
        assert_eq!(buf, b"\x04int\0");
        assert_eq!(read_fstring(&mut buf.as_slice()).unwrap(), "int");
    }

    #[test]
    fn reads_ucs2_fstring() {
        let mut buf = Vec::new();
        put_compact_index(&mut buf, -3);
        buf.extend_from_slice(&[b'h', 0, b'i', 0, 0, 0]);
        assert_eq!(read_fstring(&mut buf.as_slice()).unwrap(), "hi");
    }

    #[test]
    fn truncated_fstring_is_rejected() {
        assert!(read_fstring(&mut &b"\x0aabc"[..]).is_err());
    }

    #[test]
    fn parses_entry() {
        let mut entry = vec![81, 169, 230, 12];
        entry.put_u16_le(7777);
        entry.put_u16_le(7778);
        put_fstring(&mut entry, "Some Server");
        let server = parse_server_entry(&entry).unwrap();
        assert_eq!(server.ip, Ipv4Addr::new(81, 169, 230, 12));
        assert_eq!(server.query_port, 7778);
        assert_eq!(server.game_port, Some(7777));
    }

    async fn send_fstring_frame(stream: &mut TcpStream, value: &str) {
        let mut payload = Vec::new();
        put_fstring(&mut payload, value);
        write_frame(stream, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn handshake_and_list() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            send_fstring_frame(&mut stream, "12345").await;

            let auth = read_frame(&mut stream).await.unwrap();
            let mut auth = auth.as_slice();
            assert_eq!(read_fstring(&mut auth).unwrap(), md5_hex("ABCDE"));
            assert_eq!(read_fstring(&mut auth).unwrap(), md5_hex("ABCDE12345"));
            assert_eq!(read_fstring(&mut auth).unwrap(), "UT2K4CLIENT");
            send_fstring_frame(&mut stream, APPROVED).await;

            read_frame(&mut stream).await.unwrap();
            send_fstring_frame(&mut stream, VERIFIED).await;

            read_frame(&mut stream).await.unwrap();
            let mut header = Vec::new();
            header.put_u32_le(1);
            header.put_u8(0);
            write_frame(&mut stream, &header).await.unwrap();

            let mut entry = vec![1, 2, 3, 4];
            entry.put_u16_le(7777);
            entry.put_u16_le(7778);
            write_frame(&mut stream, &entry).await.unwrap();
        });

        let principal = Unreal2Principal::new(
            "127.0.0.1",
            port,
            ClientIdentity::UT2004,
            SecretString::from("ABCDE".to_owned()),
            Duration::from_secs(2),
        );
        let servers = principal.get_servers().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].query_port, 7778);
    }

    #[tokio::test]
    async fn rejected_key_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            send_fstring_frame(&mut stream, "12345").await;
            read_frame(&mut stream).await.unwrap();
            send_fstring_frame(&mut stream, "DENIED").await;
        });

        let principal = Unreal2Principal::new(
            "127.0.0.1",
            port,
            ClientIdentity::UT2004,
            SecretString::from("bad".to_owned()),
            Duration::from_secs(2),
        );
        assert!(matches!(
            principal.get_servers().await,
            Err(Error::Protocol { .. })
        ));
    }
}
