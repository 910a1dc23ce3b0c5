//! Node addresses.
//!
//! A `NodeAddress` couples a network endpoint with its position on the ring.
//! Equality and hashing go by endpoint (two processes on the same host:port
//! are the same node); ring arithmetic goes by identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::id::{RingId, RingSpace};

/// Network endpoint plus ring identifier of a node.
///
/// Immutable once constructed. Cheap to clone; the host string is the only
/// allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
    pub id: RingId,
}

impl NodeAddress {
    /// Construct an address whose identifier is derived from `host:port`,
    /// reduced into `space`.
    pub fn new(host: impl Into<String>, port: u16, space: RingSpace) -> Self {
        let host = host.into();
        let id = space.hash_reduced(format!("{}:{}", host, port).as_bytes());
        Self { host, port, id }
    }

    /// Construct an address with an explicit identifier (already reduced).
    pub fn with_id(host: impl Into<String>, port: u16, id: RingId) -> Self {
        Self {
            host: host.into(),
            port,
            id,
        }
    }

    /// Parse a `host:port` endpoint into an address, deriving the identifier
    /// from the endpoint as [`NodeAddress::new`] does.
    pub fn parse(endpoint: &str, space: RingSpace) -> Result<Self> {
        let Some((host, port)) = endpoint.rsplit_once(':') else {
            return Err(Error::InvalidAddress(format!(
                "expected host:port, got {:?}",
                endpoint
            )));
        };
        if host.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "empty host in {:?}",
                endpoint
            )));
        }
        let port: u16 = port.parse().map_err(|_| {
            Error::InvalidAddress(format!("invalid port in {:?}", endpoint))
        })?;
        Ok(Self::new(host, port, space))
    }

    /// `host:port` form used for connecting.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for NodeAddress {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for NodeAddress {}

impl Hash for NodeAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (id {})", self.host, self.port, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_endpoint() {
        let a = NodeAddress::with_id("h", 4000, RingId(1));
        let b = NodeAddress::with_id("h", 4000, RingId(99));
        let c = NodeAddress::with_id("h", 4001, RingId(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_is_derived_and_reduced() {
        let space = RingSpace::new(8).unwrap();
        let a = NodeAddress::new("127.0.0.1", 4000, space);
        let b = NodeAddress::new("127.0.0.1", 4000, space);
        assert_eq!(a.id, b.id);
        assert!(a.id.0 < space.size());
    }

    #[test]
    fn parse_accepts_host_port() {
        let space = RingSpace::new(8).unwrap();
        let parsed = NodeAddress::parse("127.0.0.1:4000", space).unwrap();
        assert_eq!(parsed, NodeAddress::new("127.0.0.1", 4000, space));
        assert_eq!(parsed.id, NodeAddress::new("127.0.0.1", 4000, space).id);
    }

    #[test]
    fn parse_rejects_malformed_endpoints() {
        let space = RingSpace::new(8).unwrap();
        for bad in ["no-port", "host:", "host:notaport", ":4000", "host:70000"] {
            assert!(
                NodeAddress::parse(bad, space).is_err(),
                "{:?} should not parse",
                bad
            );
        }
    }
}
