//! Attribute types and backend traits

use std::fmt;
use std::net::IpAddr;

/// Configuration attribute type (RFC 7296 Section 3.15.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeType {
    /// INTERNAL_IP4_ADDRESS
    InternalIp4Address,
    /// INTERNAL_IP4_NETMASK
    InternalIp4Netmask,
    /// INTERNAL_IP4_DNS
    InternalIp4Dns,
    /// INTERNAL_IP4_NBNS
    InternalIp4Nbns,
    /// INTERNAL_IP4_DHCP
    InternalIp4Dhcp,
    /// APPLICATION_VERSION
    ApplicationVersion,
    /// INTERNAL_IP6_ADDRESS
    InternalIp6Address,
    /// INTERNAL_IP6_DNS
    InternalIp6Dns,
    /// INTERNAL_IP6_DHCP
    InternalIp6Dhcp,
    /// INTERNAL_IP4_SUBNET
    InternalIp4Subnet,
    /// SUPPORTED_ATTRIBUTES
    SupportedAttributes,
    /// INTERNAL_IP6_SUBNET
    InternalIp6Subnet,
    /// Private use or unassigned
    Other(u16),
}

impl AttributeType {
    /// Convert from u16
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => AttributeType::InternalIp4Address,
            2 => AttributeType::InternalIp4Netmask,
            3 => AttributeType::InternalIp4Dns,
            4 => AttributeType::InternalIp4Nbns,
            6 => AttributeType::InternalIp4Dhcp,
            7 => AttributeType::ApplicationVersion,
            8 => AttributeType::InternalIp6Address,
            10 => AttributeType::InternalIp6Dns,
            12 => AttributeType::InternalIp6Dhcp,
            13 => AttributeType::InternalIp4Subnet,
            14 => AttributeType::SupportedAttributes,
            15 => AttributeType::InternalIp6Subnet,
            other => AttributeType::Other(other),
        }
    }

    /// Convert to u16
    pub fn to_u16(self) -> u16 {
        match self {
            AttributeType::InternalIp4Address => 1,
            AttributeType::InternalIp4Netmask => 2,
            AttributeType::InternalIp4Dns => 3,
            AttributeType::InternalIp4Nbns => 4,
            AttributeType::InternalIp4Dhcp => 6,
            AttributeType::ApplicationVersion => 7,
            AttributeType::InternalIp6Address => 8,
            AttributeType::InternalIp6Dns => 10,
            AttributeType::InternalIp6Dhcp => 12,
            AttributeType::InternalIp4Subnet => 13,
            AttributeType::SupportedAttributes => 14,
            AttributeType::InternalIp6Subnet => 15,
            AttributeType::Other(v) => v,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::InternalIp4Address => f.write_str("INTERNAL_IP4_ADDRESS"),
            AttributeType::InternalIp4Netmask => f.write_str("INTERNAL_IP4_NETMASK"),
            AttributeType::InternalIp4Dns => f.write_str("INTERNAL_IP4_DNS"),
            AttributeType::InternalIp4Nbns => f.write_str("INTERNAL_IP4_NBNS"),
            AttributeType::InternalIp4Dhcp => f.write_str("INTERNAL_IP4_DHCP"),
            AttributeType::ApplicationVersion => f.write_str("APPLICATION_VERSION"),
            AttributeType::InternalIp6Address => f.write_str("INTERNAL_IP6_ADDRESS"),
            AttributeType::InternalIp6Dns => f.write_str("INTERNAL_IP6_DNS"),
            AttributeType::InternalIp6Dhcp => f.write_str("INTERNAL_IP6_DHCP"),
            AttributeType::InternalIp4Subnet => f.write_str("INTERNAL_IP4_SUBNET"),
            AttributeType::SupportedAttributes => f.write_str("SUPPORTED_ATTRIBUTES"),
            AttributeType::InternalIp6Subnet => f.write_str("INTERNAL_IP6_SUBNET"),
            AttributeType::Other(v) => write!(f, "ATTRIBUTE_{}", v),
        }
    }
}

/// One attribute with its raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAttribute {
    /// Attribute type
    pub kind: AttributeType,
    /// Encoded value (may be empty in requests)
    pub value: Vec<u8>,
}

impl ConfigAttribute {
    /// Create an attribute
    pub fn new(kind: AttributeType, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Responder-side attribute backend (address pools, DNS servers, ...)
pub trait AttributeProvider: Send + Sync {
    /// Assign an address from `pool` to peer `id`
    ///
    /// `requested` is the address the peer asked for, if any. Returns `None`
    /// if this provider does not serve the pool or it is exhausted.
    fn acquire_address(&self, pool: &str, id: &str, requested: Option<IpAddr>) -> Option<IpAddr>;

    /// Return an address to `pool`; `false` if not ours
    fn release_address(&self, pool: &str, address: IpAddr, id: &str) -> bool;

    /// Attributes to send to peer `id` holding virtual IP `vip`
    fn attributes(&self, _pool: Option<&str>, _id: &str, _vip: Option<IpAddr>) -> Vec<ConfigAttribute> {
        Vec::new()
    }
}

/// Initiator-side attribute consumer (resolver config, ...)
pub trait AttributeHandler: Send + Sync {
    /// Apply an attribute received from `server`; `false` if not handled
    fn handle(&self, server: &str, kind: AttributeType, data: &[u8]) -> bool;

    /// Undo a previously handled attribute
    fn release(&self, server: &str, kind: AttributeType, data: &[u8]);

    /// Attributes to request from `server`
    fn attributes(&self, _server: &str, _vip: Option<IpAddr>) -> Vec<ConfigAttribute> {
        Vec::new()
    }
}
