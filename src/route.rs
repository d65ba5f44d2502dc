//! Route model for attributed payment attempts
//!
//! A route is the path a single payment attempt took: the local node as
//! source, followed by one hop per forwarding node up to the destination.

use crate::error::AttributionError;
use crate::vertex::Vertex;
use serde::{Deserialize, Serialize};

/// Payment amount in millisatoshis
pub type MilliSatoshi = u64;

/// A single hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// Public key of the node this hop arrives at
    pub pub_key_bytes: Vertex,
    /// Short channel id of the channel used to reach this node
    #[serde(default)]
    pub channel_id: u64,
    /// Amount the previous node forwards to this node
    pub amt_to_forward: MilliSatoshi,
}

impl Hop {
    /// Create a new hop
    pub fn new(pub_key_bytes: Vertex, channel_id: u64, amt_to_forward: MilliSatoshi) -> Self {
        Self {
            pub_key_bytes,
            channel_id,
            amt_to_forward,
        }
    }
}

/// Serialized form of a route, validated on conversion
#[derive(Deserialize)]
struct RawRoute {
    source_pub_key: Vertex,
    total_amount: MilliSatoshi,
    hops: Vec<Hop>,
}

/// An immutable route with at least one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRoute")]
pub struct Route {
    source_pub_key: Vertex,
    total_amount: MilliSatoshi,
    hops: Vec<Hop>,
}

impl Route {
    /// Create a new route
    ///
    /// Fails if `hops` is empty: a route always reaches at least one node
    /// besides the local one.
    pub fn new(
        source_pub_key: Vertex,
        total_amount: MilliSatoshi,
        hops: Vec<Hop>,
    ) -> Result<Self, AttributionError> {
        if hops.is_empty() {
            return Err(AttributionError::InvalidRoute(
                "Route must contain at least one hop".to_string(),
            ));
        }

        Ok(Self {
            source_pub_key,
            total_amount,
            hops,
        })
    }

    /// Public key of the local node
    pub fn source_pub_key(&self) -> Vertex {
        self.source_pub_key
    }

    /// Amount sent by the local node, fees included
    pub fn total_amount(&self) -> MilliSatoshi {
        self.total_amount
    }

    /// Hops in forwarding order
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Number of hops (the position of the destination)
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Final destination of the route
    pub fn destination(&self) -> Vertex {
        // Non-empty by construction
        self.hops[self.hops.len() - 1].pub_key_bytes
    }

    /// Node at a route position, where 0 is the local node and `hop_count()`
    /// is the destination
    pub fn node_at(&self, position: usize) -> Option<Vertex> {
        match position {
            0 => Some(self.source_pub_key),
            p => self.hops.get(p - 1).map(|hop| hop.pub_key_bytes),
        }
    }
}

impl TryFrom<RawRoute> for Route {
    type Error = AttributionError;

    fn try_from(raw: RawRoute) -> Result<Self, Self::Error> {
        Route::new(raw.source_pub_key, raw.total_amount, raw.hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::VERTEX_LEN;

    fn vertex(tag: u8) -> Vertex {
        let mut bytes = [0u8; VERTEX_LEN];
        bytes[0] = 1;
        bytes[1] = tag;
        Vertex::from(bytes)
    }

    fn two_hop() -> Route {
        Route::new(
            vertex(0),
            100,
            vec![Hop::new(vertex(1), 11, 99), Hop::new(vertex(2), 12, 97)],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_route_rejected() {
        let result = Route::new(vertex(0), 100, Vec::new());
        assert!(matches!(result, Err(AttributionError::InvalidRoute(_))));
    }

    #[test]
    fn test_node_positions() {
        let route = two_hop();

        assert_eq!(route.hop_count(), 2);
        assert_eq!(route.node_at(0), Some(vertex(0)));
        assert_eq!(route.node_at(1), Some(vertex(1)));
        assert_eq!(route.node_at(2), Some(vertex(2)));
        assert_eq!(route.node_at(3), None);
        assert_eq!(route.destination(), vertex(2));
    }

    #[test]
    fn test_deserialize_validates() {
        let route = two_hop();
        let json = serde_json::to_string(&route).unwrap();
        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);

        let empty = format!(
            r#"{{"source_pub_key":"{}","total_amount":100,"hops":[]}}"#,
            vertex(0)
        );
        assert!(serde_json::from_str::<Route>(&empty).is_err());
    }
}
