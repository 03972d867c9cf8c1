// Principal hostname resolution

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tracing::debug;

use crate::error::Error;

/// Resolve `host` to its IPv4 addresses, in resolver order.
///
/// IP literals are returned as-is without a lookup.
pub async fn resolve_host(host: &str, timeout: Duration) -> Result<Vec<Ipv4Addr>, Error> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(vec![ip]);
    }

    let lookup = tokio::net::lookup_host((host, 0));
    let addrs = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(addrs)) => addrs,
        Ok(Err(e)) => {
            debug!(host, error = %e, "lookup failed");
            return Err(Error::Resolution { host: host.into() });
        }
        Err(_) => return Err(Error::timeout(timeout)),
    };

    let mut ips = Vec::new();
    for addr in addrs {
        if let IpAddr::V4(ip) = addr.ip() {
            if !ips.contains(&ip) {
                ips.push(ip);
            }
        }
    }

    if ips.is_empty() {
        return Err(Error::Resolution { host: host.into() });
    }
    Ok(ips)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literal_is_returned_without_lookup() {
        let ips = resolve_host("192.0.2.10", Duration::from_secs(1)).await.unwrap();
        assert_eq!(ips, vec![Ipv4Addr::new(192, 0, 2, 10)]);
    }
}
