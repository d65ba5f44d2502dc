//! Attribution results and the blame helpers that build them
//!
//! All translation between route positions and hop indices lives in
//! [`pair_at`] and [`AttributionResult::blame_node`].

use crate::error::InvariantViolation;
use crate::route::{MilliSatoshi, Route};
use crate::vertex::{DirectedNodePair, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Why a payment should not be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalFailureReason {
    /// Unrecoverable failure at or towards the destination
    Error,
    /// Destination rejected the payment hash, amount or final expiry
    IncorrectPaymentDetails,
}

/// Outcome of attributing a single failed payment attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionResult {
    /// Node to penalize across all of its channels
    pub node_failure: Option<Vertex>,
    /// Pairs to penalize, mapped to the minimum amount the penalty applies to.
    /// Zero penalizes any amount.
    #[serde(with = "pair_entries")]
    pub pair_results: HashMap<DirectedNodePair, MilliSatoshi>,
    /// Set when no further attempt for this payment makes sense
    pub final_failure_reason: Option<FinalFailureReason>,
    /// Pair whose channel policy may be out of date (second chance)
    pub policy_failure: Option<DirectedNodePair>,
}

impl AttributionResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the payment should be abandoned
    pub fn is_terminal(&self) -> bool {
        self.final_failure_reason.is_some()
    }

    /// Whether nothing was attributed at all
    pub fn is_empty(&self) -> bool {
        self.node_failure.is_none()
            && self.pair_results.is_empty()
            && self.final_failure_reason.is_none()
            && self.policy_failure.is_none()
    }

    /// Minimum penalty amount recorded for a pair, if it was blamed
    pub fn pair_amount(&self, pair: &DirectedNodePair) -> Option<MilliSatoshi> {
        self.pair_results.get(pair).copied()
    }

    /// Blamed pairs in a stable order
    pub fn blamed_pairs(&self) -> Vec<(DirectedNodePair, MilliSatoshi)> {
        let mut pairs: Vec<_> = self.pair_results.iter().map(|(p, a)| (*p, *a)).collect();
        pairs.sort();
        pairs
    }

    /// Blame the node at `position` for all of its channels.
    ///
    /// Position 0 is the local node, which never blames itself.
    pub fn blame_node(&mut self, route: &Route, position: usize) -> Result<(), InvariantViolation> {
        if position == 0 {
            return Err(InvariantViolation::SelfBlamed);
        }

        let node = route
            .node_at(position)
            .ok_or(InvariantViolation::PositionOutOfRange {
                position,
                hops: route.hop_count(),
            })?;

        trace!("Blaming node {:?} at position {}", node, position);
        self.node_failure = Some(node);
        Ok(())
    }

    /// Blame the pairs at positions `from..=to` in both directions
    pub fn blame_pair_range(
        &mut self,
        route: &Route,
        from: usize,
        to: usize,
    ) -> Result<(), InvariantViolation> {
        for position in from..=to {
            self.blame_pair(route, position)?;
        }
        Ok(())
    }

    /// Blame the pair at `position` in both directions, for any amount
    pub fn blame_pair(&mut self, route: &Route, position: usize) -> Result<(), InvariantViolation> {
        let (pair, _) = pair_at(route, position)?;

        trace!("Blaming pair {:?} -> {:?} both ways", pair.from, pair.to);
        self.pair_results.insert(pair, 0);
        self.pair_results.insert(pair.reverse(), 0);
        Ok(())
    }

    /// Blame the pair at `position` in the forward direction only, for
    /// amounts at or above what was forwarded across it
    pub fn blame_pair_balance(
        &mut self,
        route: &Route,
        position: usize,
    ) -> Result<(), InvariantViolation> {
        let (pair, amount) = pair_at(route, position)?;

        trace!(
            "Blaming pair {:?} -> {:?} for amounts >= {} msat",
            pair.from,
            pair.to,
            amount
        );
        self.pair_results.insert(pair, amount);
        Ok(())
    }
}

/// The directed pair leaving route position `position`, together with the
/// amount sent across it.
///
/// Position 0 is the local node's own channel, carrying the route total.
pub fn pair_at(
    route: &Route,
    position: usize,
) -> Result<(DirectedNodePair, MilliSatoshi), InvariantViolation> {
    let hops = route.hops();
    let out_of_range = InvariantViolation::PositionOutOfRange {
        position,
        hops: hops.len(),
    };

    if position >= hops.len() {
        return Err(out_of_range);
    }

    if position == 0 {
        let pair = DirectedNodePair::new(route.source_pub_key(), hops[0].pub_key_bytes);
        return Ok((pair, route.total_amount()));
    }

    let prev = &hops[position - 1];
    let pair = DirectedNodePair::new(prev.pub_key_bytes, hops[position].pub_key_bytes);
    Ok((pair, prev.amt_to_forward))
}

/// JSON maps need string keys, so pair results travel as a list of entries
mod pair_entries {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    struct PairEntry {
        from: Vertex,
        to: Vertex,
        min_amount: MilliSatoshi,
    }

    pub fn serialize<S: Serializer>(
        pairs: &HashMap<DirectedNodePair, MilliSatoshi>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = pairs
            .iter()
            .map(|(pair, amount)| PairEntry {
                from: pair.from,
                to: pair.to,
                min_amount: *amount,
            })
            .collect();
        entries.sort_by(|a, b| (a.from, a.to).cmp(&(b.from, b.to)));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<DirectedNodePair, MilliSatoshi>, D::Error> {
        let entries = Vec::<PairEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (DirectedNodePair::new(e.from, e.to), e.min_amount))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Hop;
    use crate::vertex::VERTEX_LEN;

    fn vertex(tag: u8) -> Vertex {
        let mut bytes = [0u8; VERTEX_LEN];
        bytes[0] = 1;
        bytes[1] = tag;
        Vertex::from(bytes)
    }

    fn three_hop() -> Route {
        Route::new(
            vertex(0),
            100,
            vec![
                Hop::new(vertex(1), 1, 99),
                Hop::new(vertex(2), 2, 97),
                Hop::new(vertex(3), 3, 94),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pair_at_source() {
        let route = three_hop();
        let (pair, amount) = pair_at(&route, 0).unwrap();

        assert_eq!(pair, DirectedNodePair::new(vertex(0), vertex(1)));
        assert_eq!(amount, 100);
    }

    #[test]
    fn test_pair_at_intermediate() {
        let route = three_hop();

        let (pair, amount) = pair_at(&route, 1).unwrap();
        assert_eq!(pair, DirectedNodePair::new(vertex(1), vertex(2)));
        assert_eq!(amount, 99);

        let (pair, amount) = pair_at(&route, 2).unwrap();
        assert_eq!(pair, DirectedNodePair::new(vertex(2), vertex(3)));
        assert_eq!(amount, 97);
    }

    #[test]
    fn test_pair_at_out_of_range() {
        let route = three_hop();
        assert_eq!(
            pair_at(&route, 3),
            Err(InvariantViolation::PositionOutOfRange { position: 3, hops: 3 })
        );
    }

    #[test]
    fn test_blame_self_rejected() {
        let route = three_hop();
        let mut result = AttributionResult::new();

        assert_eq!(result.blame_node(&route, 0), Err(InvariantViolation::SelfBlamed));
        assert!(result.is_empty());
    }

    #[test]
    fn test_blame_node_positions() {
        let route = three_hop();
        let mut result = AttributionResult::new();

        result.blame_node(&route, 3).unwrap();
        assert_eq!(result.node_failure, Some(vertex(3)));

        assert!(result.blame_node(&route, 4).is_err());
    }

    #[test]
    fn test_pair_range_both_directions() {
        let route = three_hop();
        let mut result = AttributionResult::new();

        result.blame_pair_range(&route, 0, 1).unwrap();

        assert_eq!(result.pair_results.len(), 4);
        for (pair, amount) in result.blamed_pairs() {
            assert_eq!(amount, 0);
            assert_eq!(result.pair_amount(&pair.reverse()), Some(0));
        }
    }

    #[test]
    fn test_pair_balance_forward_only() {
        let route = three_hop();
        let mut result = AttributionResult::new();

        result.blame_pair_balance(&route, 2).unwrap();

        let pair = DirectedNodePair::new(vertex(2), vertex(3));
        assert_eq!(result.pair_results.len(), 1);
        assert_eq!(result.pair_amount(&pair), Some(97));
        assert_eq!(result.pair_amount(&pair.reverse()), None);
    }

    #[test]
    fn test_serde_pair_entries() {
        let route = three_hop();
        let mut result = AttributionResult::new();
        result.blame_pair(&route, 1).unwrap();
        result.final_failure_reason = Some(FinalFailureReason::IncorrectPaymentDetails);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pair_results"].as_array().unwrap().len(), 2);
        assert_eq!(json["final_failure_reason"], "incorrect_payment_details");

        let back: AttributionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
