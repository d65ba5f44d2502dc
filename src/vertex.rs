//! Node identities and directed node pairs
//!
//! A vertex is the compressed public key of a routing node. Pairs of vertices
//! key the per-channel penalties produced by the classifier.

use crate::error::AttributionError;
use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a compressed secp256k1 public key
pub const VERTEX_LEN: usize = 33;

/// Opaque node identifier (compressed public key bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex([u8; VERTEX_LEN]);

impl Vertex {
    /// Create a vertex from a byte slice, which must be exactly 33 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AttributionError> {
        let bytes: [u8; VERTEX_LEN] = bytes.try_into().map_err(|_| {
            AttributionError::InvalidVertex(format!(
                "expected {} bytes, got {}",
                VERTEX_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; VERTEX_LEN] {
        &self.0
    }

    /// Parse the bytes as a secp256k1 public key
    pub fn to_public_key(&self) -> Result<PublicKey, AttributionError> {
        PublicKey::from_slice(&self.0)
            .map_err(|e| AttributionError::InvalidVertex(format!("not a public key: {}", e)))
    }
}

impl From<[u8; VERTEX_LEN]> for Vertex {
    fn from(bytes: [u8; VERTEX_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<PublicKey> for Vertex {
    fn from(key: PublicKey) -> Self {
        Self(key.serialize())
    }
}

impl From<&PublicKey> for Vertex {
    fn from(key: &PublicKey) -> Self {
        Self(key.serialize())
    }
}

impl FromStr for Vertex {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| AttributionError::InvalidVertex(format!("bad hex '{}': {}", s, e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "Vertex({})", hex::encode(&self.0[..8]))
    }
}

impl Serialize for Vertex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Vertex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered pair of vertices, keyed by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirectedNodePair {
    /// Sending side
    pub from: Vertex,
    /// Receiving side
    pub to: Vertex,
}

impl DirectedNodePair {
    /// Create a new directed pair
    pub fn new(from: Vertex, to: Vertex) -> Self {
        Self { from, to }
    }

    /// The same pair in the opposite direction
    pub fn reverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for DirectedNodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};
    use std::collections::HashMap;

    fn vertex(tag: u8) -> Vertex {
        let mut bytes = [0u8; VERTEX_LEN];
        bytes[0] = 2;
        bytes[1] = tag;
        Vertex::from(bytes)
    }

    #[test]
    fn test_reverse() {
        let pair = DirectedNodePair::new(vertex(1), vertex(2));
        let reversed = pair.reverse();

        assert_eq!(reversed.from, vertex(2));
        assert_eq!(reversed.to, vertex(1));
        assert_eq!(reversed.reverse(), pair);
    }

    #[test]
    fn test_directions_are_distinct_keys() {
        let pair = DirectedNodePair::new(vertex(1), vertex(2));

        let mut map = HashMap::new();
        map.insert(pair, 10u64);
        map.insert(pair.reverse(), 20u64);

        assert_eq!(map.len(), 2);
        assert_eq!(map[&pair], 10);
        assert_eq!(map[&pair.reverse()], 20);
    }

    #[test]
    fn test_hex_round_trip() {
        let v = vertex(7);
        let parsed: Vertex = v.to_string().parse().unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(Vertex::from_slice(&[1u8; 32]).is_err());
        assert!("0203".parse::<Vertex>().is_err());
        assert!("zz".parse::<Vertex>().is_err());
    }

    #[test]
    fn test_from_public_key() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let key = PublicKey::from_secret_key(&secp, &secret);

        let v = Vertex::from(key);
        assert_eq!(v.as_bytes(), &key.serialize());
        assert_eq!(v.to_public_key().unwrap(), key);
    }

    #[test]
    fn test_serde_as_hex() {
        let pair = DirectedNodePair::new(vertex(1), vertex(2));
        let json = serde_json::to_value(pair).unwrap();

        assert_eq!(json["from"], serde_json::Value::String(vertex(1).to_string()));

        let back: DirectedNodePair = serde_json::from_value(json).unwrap();
        assert_eq!(back, pair);
    }
}
