// Valve master server protocol and A2S_INFO queries

use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{Buf, BufMut};
use tracing::{debug, warn};

use super::{RawServer, read_cstring, udp_exchange};
use crate::error::Error;

const OOB: &[u8] = b"\xff\xff\xff\xff";
const LIST_HEADER: &[u8] = b"\xff\xff\xff\xff\x66\x0a";
const INFO_REQUEST: &[u8] = b"\xff\xff\xff\xffTSource Engine Query\0";
const CHALLENGE: u8 = 0x41;
const INFO_RESPONSE: u8 = 0x49;
const THE_SHIP_APP_ID: u16 = 2400;
const EDF_PORT: u8 = 0x80;

/// Master server region codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    UsEast,
    UsWest,
    SouthAmerica,
    Europe,
    Asia,
    Australia,
    MiddleEast,
    Africa,
    Rest,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::UsEast,
        Region::UsWest,
        Region::SouthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Australia,
        Region::MiddleEast,
        Region::Africa,
        Region::Rest,
    ];

    fn code(self) -> u8 {
        match self {
            Region::UsEast => 0x00,
            Region::UsWest => 0x01,
            Region::SouthAmerica => 0x02,
            Region::Europe => 0x03,
            Region::Asia => 0x04,
            Region::Australia => 0x05,
            Region::MiddleEast => 0x06,
            Region::Africa => 0x07,
            Region::Rest => 0xff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValvePrincipal {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ValvePrincipal {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Page through the master list for `filter` in `region`.
    ///
    /// Each page is seeded with the last address of the previous one; the
    /// list ends with `0.0.0.0:0`.
    pub async fn get_servers(
        &self,
        filter: &str,
        region: Region,
        max_pages: u32,
    ) -> Result<Vec<RawServer>, Error> {
        let mut servers = Vec::new();
        let mut seed = (Ipv4Addr::UNSPECIFIED, 0u16);
        for page in 0..max_pages {
            let request = list_request(region, seed, filter);
            let reply = udp_exchange(&self.host, self.port, &request, self.timeout).await?;
            let (entries, done) = parse_list_page(&reply)?;
            debug!(?region, page, entries = entries.len(), "valve principal page");

            if let Some(last) = entries.last() {
                seed = (last.ip, last.query_port);
            }
            servers.extend(entries);
            if done {
                return Ok(servers);
            }
        }
        warn!(?region, max_pages, "stopped paging at page limit");
        Ok(servers)
    }
}

fn list_request(region: Region, seed: (Ipv4Addr, u16), filter: &str) -> Vec<u8> {
    let mut request = Vec::with_capacity(32 + filter.len());
    request.put_u8(0x31);
    request.put_u8(region.code());
    request.put_slice(format!("{}:{}", seed.0, seed.1).as_bytes());
    request.put_u8(0);
    request.put_slice(filter.as_bytes());
    request.put_u8(0);
    request
}

/// Parse one master reply. Returns the entries and whether the list ended.
pub fn parse_list_page(reply: &[u8]) -> Result<(Vec<RawServer>, bool), Error> {
    let mut rest = reply
        .strip_prefix(LIST_HEADER)
        .ok_or_else(|| Error::protocol("unexpected master server reply header"))?;

    let mut entries = Vec::new();
    while rest.remaining() >= 6 {
        let ip = Ipv4Addr::new(rest.get_u8(), rest.get_u8(), rest.get_u8(), rest.get_u8());
        let port = rest.get_u16();
        if ip.is_unspecified() && port == 0 {
            return Ok((entries, true));
        }
        entries.push(RawServer::new(ip, port));
    }
    Ok((entries, false))
}

/// The parts of an A2S_INFO reply callers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValveServerInfo {
    pub name: String,
    pub map: String,
    pub app_id: u16,
    pub game_port: Option<u16>,
}

/// Query a server with A2S_INFO, answering a challenge if one is issued.
pub async fn query_info(ip: &str, port: u16, timeout: Duration) -> Result<ValveServerInfo, Error> {
    let mut reply = udp_exchange(ip, port, INFO_REQUEST, timeout).await?;
    if let Some(challenge) = challenge_of(&reply) {
        let mut request = INFO_REQUEST.to_vec();
        request.extend_from_slice(challenge);
        reply = udp_exchange(ip, port, &request, timeout).await?;
    }
    parse_info(&reply)
}

fn challenge_of(reply: &[u8]) -> Option<&[u8]> {
    let body = reply.strip_prefix(OOB)?;
    match body.split_first() {
        Some((&CHALLENGE, challenge)) if challenge.len() >= 4 => challenge.get(..4),
        _ => None,
    }
}

pub fn parse_info(reply: &[u8]) -> Result<ValveServerInfo, Error> {
    let body = reply
        .strip_prefix(OOB)
        .ok_or_else(|| Error::protocol("split or malformed A2S_INFO reply"))?;
    let mut rest = match body.split_first() {
        Some((&INFO_RESPONSE, rest)) => rest,
        _ => return Err(Error::protocol("unexpected A2S_INFO reply type")),
    };

    let too_short = || Error::protocol("truncated A2S_INFO reply");
    if !rest.has_remaining() {
        return Err(too_short());
    }
    let _protocol = rest.get_u8();
    let name = read_cstring(&mut rest)?;
    let map = read_cstring(&mut rest)?;
    let _folder = read_cstring(&mut rest)?;
    let _game = read_cstring(&mut rest)?;
    if rest.remaining() < 9 {
        return Err(too_short());
    }
    let app_id = rest.get_u16_le();
    // players, max players, bots, server type, environment, visibility, VAC
    rest.advance(7);
    if app_id == THE_SHIP_APP_ID {
        if rest.remaining() < 3 {
            return Err(too_short());
        }
        rest.advance(3);
    }
    let _version = read_cstring(&mut rest)?;

    let mut game_port = None;
    if rest.has_remaining() {
        let edf = rest.get_u8();
        if edf & EDF_PORT != 0 && rest.remaining() >= 2 {
            game_port = Some(rest.get_u16_le());
        }
    }

    Ok(ValveServerInfo {
        name,
        map,
        app_id,
        game_port,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info_reply(app_id: u16, edf_port: Option<u16>) -> Vec<u8> {
        let mut reply = OOB.to_vec();
        reply.put_u8(INFO_RESPONSE);
        reply.put_u8(17);
        for s in ["My Server", "de_dust2", "cstrike", "Counter-Strike"] {
            reply.put_slice(s.as_bytes());
            reply.put_u8(0);
        }
        reply.put_u16_le(app_id);
        reply.put_slice(&[10, 32, 0, b'd', b'l', 0, 1]);
        reply.put_slice(b"1.0.0.0\0");
        if let Some(port) = edf_port {
            reply.put_u8(EDF_PORT);
            reply.put_u16_le(port);
        }
        reply
    }

    #[test]
    fn list_request_layout() {
        let request = list_request(Region::Europe, (Ipv4Addr::UNSPECIFIED, 0), "\\appid\\440");
        assert_eq!(request, b"\x31\x030.0.0.0:0\0\\appid\\440\0".to_vec());
    }

    #[test]
    fn parses_page_and_end_marker() {
        let mut reply = LIST_HEADER.to_vec();
        reply.put_slice(&[1, 2, 3, 4]);
        reply.put_u16(27015);
        reply.put_slice(&[0, 0, 0, 0]);
        reply.put_u16(0);

        let (entries, done) = parse_list_page(&reply).unwrap();
        assert!(done);
        assert_eq!(entries, vec![RawServer::new(Ipv4Addr::new(1, 2, 3, 4), 27015)]);
    }

    #[test]
    fn page_without_end_marker_continues() {
        let mut reply = LIST_HEADER.to_vec();
        reply.put_slice(&[1, 2, 3, 4]);
        reply.put_u16(27015);
        let (_, done) = parse_list_page(&reply).unwrap();
        assert!(!done);
    }

    #[test]
    fn parses_info_with_game_port() {
        let info = parse_info(&info_reply(10, Some(27016))).unwrap();
        assert_eq!(info.name, "My Server");
        assert_eq!(info.map, "de_dust2");
        assert_eq!(info.app_id, 10);
        assert_eq!(info.game_port, Some(27016));
    }

    #[test]
    fn parses_info_without_extra_data() {
        let info = parse_info(&info_reply(10, None)).unwrap();
        assert_eq!(info.game_port, None);
    }

    #[test]
    fn detects_challenge() {
        let reply = b"\xff\xff\xff\xff\x41\x01\x02\x03\x04";
        assert_eq!(challenge_of(reply), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(challenge_of(&info_reply(10, None)), None);
    }
}
