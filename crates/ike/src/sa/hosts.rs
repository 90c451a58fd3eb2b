//! Peer host pair of an IKE SA

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Local and remote address of an IKE SA
///
/// A freshly created SA has both sides unspecified until the caller records
/// the addresses the exchange actually uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostPair {
    /// Our address
    pub local: IpAddr,
    /// Peer address
    pub remote: IpAddr,
}

impl HostPair {
    /// Create a host pair
    pub fn new(local: IpAddr, remote: IpAddr) -> Self {
        Self { local, remote }
    }

    /// Both sides unspecified (`0.0.0.0`)
    pub fn unspecified() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self::new(any, any)
    }

    /// Check if neither side is known yet
    pub fn is_unspecified(&self) -> bool {
        self.local.is_unspecified() && self.remote.is_unspecified()
    }

    /// Check if this pair satisfies a lookup
    ///
    /// An unspecified address in the query matches any stored address on
    /// that side. Stored addresses are compared literally, so an SA whose
    /// hosts were never set only matches the any/any side of a query.
    pub fn matches(&self, local: &IpAddr, remote: &IpAddr) -> bool {
        side_matches(local, &self.local) && side_matches(remote, &self.remote)
    }
}

impl Default for HostPair {
    fn default() -> Self {
        Self::unspecified()
    }
}

impl fmt::Display for HostPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...{}", self.local, self.remote)
    }
}

fn side_matches(query: &IpAddr, stored: &IpAddr) -> bool {
    query.is_unspecified() || query == stored
}
