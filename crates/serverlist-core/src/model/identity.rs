// ── Server identity and address validation ──

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Derive the stable uid of a server that has no upstream identifier.
///
/// Each octet `o` becomes `((o + 2)^2 * port) / 8` in lowercase hex; the four
/// parts are joined with `-`. Existing list files depend on this exact
/// formula, so it must never change.
pub fn guid_from_ip_port(ip: Ipv4Addr, port: u16) -> String {
    let port = u64::from(port);
    ip.octets()
        .iter()
        .map(|&octet| {
            let base = u64::from(octet) + 2;
            format!("{:x}", base * base * port / 8)
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// `true` for ports a server can actually listen on.
pub fn is_valid_port(port: i64) -> bool {
    0 < port && port < 65536
}

/// `true` for globally routable unicast IPv4 addresses.
pub fn is_valid_public_ip(ip: &str) -> bool {
    ip.parse::<Ipv4Addr>().is_ok_and(is_global)
}

fn is_global(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    let shared = a == 100 && (b & 0b1100_0000) == 64;
    let benchmarking = a == 198 && (b & 0xfe) == 18;
    let reserved = a >= 240;
    let this_network = a == 0;
    let protocol_assignments = a == 192 && b == 0 && c == 0;

    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_documentation()
        || shared
        || benchmarking
        || reserved
        || this_network
        || protocol_assignments)
}

// ── Query port ──────────────────────────────────────────────────────

/// A server's query port, with `-1` meaning "not yet discovered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryPort(i64);

impl QueryPort {
    pub const UNKNOWN: Self = Self(-1);

    pub fn known(port: u16) -> Self {
        Self(i64::from(port))
    }

    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }

    /// The port, if it is known and in range.
    pub fn get(self) -> Option<u16> {
        u16::try_from(self.0).ok().filter(|&p| p > 0)
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// Overwrite with `incoming` unless it is the sentinel.
    pub fn merge(&mut self, incoming: Self) {
        if incoming.is_known() {
            *self = incoming;
        }
    }
}

impl Default for QueryPort {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<u16> for QueryPort {
    fn from(port: u16) -> Self {
        Self::known(port)
    }
}

impl fmt::Display for QueryPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_matches_known_values() {
        // (3^2 * 29900) / 8 = 33637.5 -> 33637 = 0x8365
        assert_eq!(
            guid_from_ip_port(Ipv4Addr::new(1, 1, 1, 1), 29900),
            "8365-8365-8365-8365"
        );
        assert_eq!(guid_from_ip_port(Ipv4Addr::new(0, 0, 0, 0), 8), "4-4-4-4");
    }

    #[test]
    fn guid_is_deterministic_and_input_sensitive() {
        let ip = Ipv4Addr::new(81, 169, 230, 12);
        let a = guid_from_ip_port(ip, 16567);
        assert_eq!(a, guid_from_ip_port(ip, 16567));
        assert_ne!(a, guid_from_ip_port(ip, 16568));
        assert_ne!(a, guid_from_ip_port(Ipv4Addr::new(81, 169, 230, 13), 16567));
    }

    #[test]
    fn public_ip_rules() {
        assert!(is_valid_public_ip("81.169.230.12"));
        for ip in [
            "10.0.0.1",
            "192.168.1.1",
            "172.16.0.1",
            "127.0.0.1",
            "169.254.1.1",
            "100.64.0.1",
            "224.0.0.1",
            "255.255.255.255",
            "0.0.0.0",
            "192.0.2.1",
            "240.0.0.1",
            "not-an-ip",
        ] {
            assert!(!is_valid_public_ip(ip), "{ip} should be rejected");
        }
    }

    #[test]
    fn port_range() {
        assert!(is_valid_port(1));
        assert!(is_valid_port(65535));
        assert!(!is_valid_port(0));
        assert!(!is_valid_port(65536));
        assert!(!is_valid_port(-22000));
    }

    #[test]
    fn sentinel_never_overwrites() {
        let mut port = QueryPort::known(47200);
        port.merge(QueryPort::UNKNOWN);
        assert_eq!(port.get(), Some(47200));
        port.merge(QueryPort::known(47300));
        assert_eq!(port.get(), Some(47300));
    }
}
