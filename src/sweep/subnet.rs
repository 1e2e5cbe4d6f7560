//! CIDR expansion for subnet sweeps

use crate::probe::ProbeError;
use ipnet::IpNet;
use std::net::IpAddr;

/// Largest number of hosts a single CIDR may expand to
pub const MAX_SWEEP_HOSTS: u128 = 65_536;

/// Usable host addresses of a CIDR block, ascending
///
/// Host bits in the address are ignored (`192.168.1.7/30` is the same
/// network as `192.168.1.4/30`). IPv4 networks exclude the network and
/// broadcast addresses except for /31 and /32; IPv6 networks exclude the
/// subnet-router anycast address except for /127 and /128. A bare address
/// without a prefix is a single-host network (/32 or /128).
///
/// # Errors
///
/// * `ProbeError::InvalidArgument` - the CIDR is malformed or too large
pub fn try_expand(cidr: &str) -> Result<Vec<IpAddr>, ProbeError> {
    let text = cidr.trim();
    let net = match text.parse::<IpNet>() {
        Ok(net) => net.trunc(),
        Err(_) => text
            .parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|_| ProbeError::invalid(format!("invalid CIDR '{cidr}'")))?,
    };

    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    let size = 1u128.checked_shl(host_bits).unwrap_or(u128::MAX);
    if size > MAX_SWEEP_HOSTS {
        return Err(ProbeError::invalid(format!(
            "CIDR '{cidr}' spans more than {MAX_SWEEP_HOSTS} addresses"
        )));
    }

    // ipnet only trims IPv4 networks
    let skip_router = matches!(net, IpNet::V6(_)) && net.prefix_len() < 127;
    Ok(net.hosts().skip(usize::from(skip_router)).collect())
}

/// Usable host addresses of a CIDR block as strings
///
/// Returns an empty list for malformed or oversized input; use
/// [`try_expand`] to learn why.
///
/// # Examples
///
/// ```
/// use pingsweep::expand;
///
/// assert_eq!(expand("192.168.1.0/30"), vec!["192.168.1.1", "192.168.1.2"]);
/// assert!(expand("not-a-cidr").is_empty());
/// ```
pub fn expand(cidr: &str) -> Vec<String> {
    match try_expand(cidr) {
        Ok(hosts) => hosts.iter().map(ToString::to_string).collect(),
        Err(e) => {
            tracing::debug!(cidr, error = %e, "subnet expansion failed");
            Vec::new()
        }
    }
}
