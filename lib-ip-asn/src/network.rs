//! Covering an address range with CIDR blocks.

use ipnetwork::{IpNetworkError, Ipv4Network};
use std::net::Ipv4Addr;

use crate::table::{AsEntry, LookupError};

/// The smallest list of CIDR blocks which exactly covers the
/// inclusive range `[start, end]`, in address order.  Empty if
/// `start > end`.
pub fn summarise_range(start: Ipv4Addr, end: Ipv4Addr) -> Result<Vec<Ipv4Network>, IpNetworkError> {
    let mut blocks = Vec::new();
    let mut current = u64::from(u32::from(start));
    let last = u64::from(u32::from(end));

    while current <= last {
        // largest block aligned at `current`, shrunk to fit
        let mut size = if current == 0 {
            1u64 << 32
        } else {
            1u64 << current.trailing_zeros().min(32)
        };
        while current + size - 1 > last {
            size >>= 1;
        }

        let prefix = u8::try_from(32 - size.trailing_zeros())
            .map_err(|_| IpNetworkError::InvalidPrefix)?;
        let address = u32::try_from(current)
            .map_err(|_| IpNetworkError::InvalidAddr(current.to_string()))?;
        blocks.push(Ipv4Network::new(Ipv4Addr::from(address), prefix)?);
        current += size;
    }

    Ok(blocks)
}

/// An entry's range as CIDR blocks, and the one holding an address.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryNetworks {
    /// The block of `summary` which contains the address.
    pub network: Ipv4Network,
    /// The smallest list of blocks covering the entry's range, in
    /// address order.
    pub summary: Vec<Ipv4Network>,
}

/// Summarise an entry's range and find the block which contains
/// `ip`.
pub fn get_network_of_ip(entry: &AsEntry, ip: Ipv4Addr) -> Result<EntryNetworks, LookupError> {
    let summary =
        summarise_range(entry.start, entry.end).map_err(|_| LookupError::NetworkNotFound { ip })?;
    let network = summary
        .iter()
        .find(|block| block.contains(ip))
        .copied()
        .ok_or(LookupError::NetworkNotFound { ip })?;

    Ok(EntryNetworks { network, summary })
}
