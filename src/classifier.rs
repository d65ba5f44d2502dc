//! Failure attribution for failed payment attempts
//!
//! Decides, from a single failure report, which node or channel along the
//! route most likely caused the failure and whether the payment should be
//! abandoned. The local node trusts its own onion construction completely,
//! trusts what it can observe from its direct peer, and trusts nothing that
//! remote nodes claim about themselves.

use crate::error::{AttributionError, InvariantViolation};
use crate::failure::FailureVariant;
use crate::result::{pair_at, AttributionResult, FinalFailureReason};
use crate::route::Route;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Where along the route a failure was reported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// No decodable failure (e.g. the attempt timed out)
    Unknown,
    /// The local node, relaying what its direct peer sent back
    SelfNode,
    /// A forwarding node at the given 1-based position
    Intermediate(usize),
    /// The destination
    Final,
}

impl Origin {
    /// Build an origin from the raw failure source index of an attempt
    /// over a route of `hop_count` hops
    pub fn from_source_index(
        index: Option<usize>,
        hop_count: usize,
    ) -> Result<Self, AttributionError> {
        match index {
            None => Ok(Origin::Unknown),
            Some(0) => Ok(Origin::SelfNode),
            Some(i) if i == hop_count => Ok(Origin::Final),
            Some(i) if i < hop_count => Ok(Origin::Intermediate(i)),
            Some(i) => Err(AttributionError::InvalidOrigin(format!(
                "failure source index {} exceeds route of {} hops",
                i, hop_count
            ))),
        }
    }
}

/// Failure attribution engine
///
/// Stateless; one instance can serve any number of concurrent callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    /// Create a new classifier
    pub fn new() -> Self {
        Self
    }

    /// Attribute a failed attempt over `route`.
    ///
    /// # Panics
    ///
    /// Panics if `origin` does not fit `route` (see [`Self::try_classify`]).
    pub fn classify(
        &self,
        route: &Route,
        origin: Origin,
        failure: Option<FailureVariant>,
    ) -> AttributionResult {
        match self.try_classify(route, origin, failure) {
            Ok(result) => result,
            Err(violation) => panic!("failure attribution invariant violated: {}", violation),
        }
    }

    /// Attribute a failed attempt over `route`, reporting contract violations
    /// as values.
    ///
    /// An `Intermediate` origin outside `1..hop_count` is rejected; every
    /// other combination is handled. A known origin without a decodable
    /// failure takes that origin's catch-all branch.
    pub fn try_classify(
        &self,
        route: &Route,
        origin: Origin,
        failure: Option<FailureVariant>,
    ) -> Result<AttributionResult, InvariantViolation> {
        if let Origin::Intermediate(k) = origin {
            if k == 0 || k >= route.hop_count() {
                return Err(InvariantViolation::OriginOutOfRange {
                    origin: k,
                    hops: route.hop_count(),
                });
            }
        }

        let mut result = AttributionResult::new();

        match origin {
            Origin::Unknown => self.process_unknown(route, &mut result)?,
            Origin::SelfNode => self.process_self(route, failure, &mut result)?,
            Origin::Final => self.process_final(route, failure, &mut result)?,
            Origin::Intermediate(k) => self.process_intermediate(route, k, failure, &mut result)?,
        }

        debug!(
            "Attributed {:?} from {:?}: node={:?}, pairs={}, final={:?}, policy={}",
            failure,
            origin,
            result.node_failure,
            result.pair_results.len(),
            result.final_failure_reason,
            result.policy_failure.is_some()
        );

        Ok(result)
    }

    /// Neither the failure nor its source is known.
    fn process_unknown(
        &self,
        route: &Route,
        result: &mut AttributionResult,
    ) -> Result<(), InvariantViolation> {
        let n = route.hop_count();

        // A direct payment can only have failed at the destination.
        if n == 1 {
            trace!("Unknown outcome of direct payment → blame destination");
            result.blame_node(route, n)?;
            result.final_failure_reason = Some(FinalFailureReason::Error);
            return Ok(());
        }

        // Every pair is a suspect, our own outgoing channel included, so the
        // responsible node is penalized for sure.
        trace!("Unknown outcome → blame all {} pairs", n);
        result.blame_pair_range(route, 0, n - 1)
    }

    /// Our direct peer sent the failure back to us.
    fn process_self(
        &self,
        route: &Route,
        failure: Option<FailureVariant>,
        result: &mut AttributionResult,
    ) -> Result<(), InvariantViolation> {
        if failure.is_some_and(|f| f.is_malformed_onion()) {
            // We built the onion, so the peer mangled it.
            trace!("Malformed onion from direct peer → blame peer");
            result.blame_node(route, 1)?;

            if route.hop_count() == 1 {
                result.final_failure_reason = Some(FinalFailureReason::Error);
            }
            return Ok(());
        }

        // Local channel state changed between path finding and sending. The
        // link has fresher information now, so a retry will do.
        warn!(
            "Routing failure {:?} for local channel {} occurred",
            failure,
            route.hops()[0].channel_id
        );
        Ok(())
    }

    /// The destination sent the failure.
    fn process_final(
        &self,
        route: &Route,
        failure: Option<FailureVariant>,
        result: &mut AttributionResult,
    ) -> Result<(), InvariantViolation> {
        let n = route.hop_count();

        match failure {
            // The HTLC does not match the onion. Either the destination lies
            // or its predecessor altered the HTLC.
            Some(FailureVariant::FinalIncorrectCltvExpiry)
            | Some(FailureVariant::FinalIncorrectHtlcAmount) => {
                if n == 1 {
                    trace!("{:?} from direct destination → blame destination", failure);
                    result.blame_node(route, n)?;
                    result.final_failure_reason = Some(FinalFailureReason::Error);
                    return Ok(());
                }

                trace!("{:?} from destination → blame last pair", failure);
                result.blame_pair(route, n - 1)?;
            }

            Some(FailureVariant::IncorrectPaymentAmount) | Some(FailureVariant::IncorrectDetails) => {
                result.final_failure_reason = Some(FinalFailureReason::IncorrectPaymentDetails);
            }

            // Could be a block height race or a node delaying on purpose.
            // The final cltv delta may also be wrong. Give up instead of
            // guessing, and never blame ourselves.
            Some(FailureVariant::FinalExpiryTooSoon) => {
                result.final_failure_reason = Some(FinalFailureReason::IncorrectPaymentDetails);
            }

            // Nothing else should come from a well-behaved destination,
            // undecodable failures included.
            _ => {
                trace!("{:?} from destination → blame destination", failure);
                result.blame_node(route, n)?;
                result.final_failure_reason = Some(FinalFailureReason::Error);
            }
        }

        Ok(())
    }

    /// A forwarding node at position `k` sent the failure.
    fn process_intermediate(
        &self,
        route: &Route,
        k: usize,
        failure: Option<FailureVariant>,
        result: &mut AttributionResult,
    ) -> Result<(), InvariantViolation> {
        match failure {
            // The predecessor cannot have corrupted the onion, or the reporter
            // could not have encrypted this failure for us. Blaming the
            // outgoing pair is sure to hit the responsible node. Also keeps
            // nodes from blacklisting their peers with fake reports.
            Some(f) if f.is_malformed_onion() => {
                trace!("{} at position {} → blame outgoing pair", f.name(), k);
                result.blame_pair(route, k)?;
            }
            Some(FailureVariant::UnknownNextPeer) | Some(FailureVariant::PermanentChannelFailure) => {
                trace!("{:?} at position {} → blame outgoing pair", failure, k);
                result.blame_pair(route, k)?;
            }

            // The reporter may be wrong, its predecessor may have altered the
            // HTLC, or our copy of the channel policy is stale. The last case
            // is handled by the second chance logic of the reputation store.
            Some(f) if f.is_policy_mismatch() => {
                let (policy_pair, _) = pair_at(route, k)?;
                result.policy_failure = Some(policy_pair);

                trace!("{} at position {} → blame incoming side", f.name(), k);
                self.blame_incoming(route, k, result)?;
            }

            // Not enough balance for this amount. Smaller amounts may still fit.
            Some(FailureVariant::TemporaryChannelFailure) => {
                trace!("Temporary channel failure at position {} → blame balance", k);
                result.blame_pair_balance(route, k)?;
            }

            // Some node up to the reporter held on to the HTLC, and we cannot
            // tell which. Our own clock lagging is ignored.
            Some(FailureVariant::ExpiryTooSoon) => {
                trace!("Expiry too soon at position {} → blame prefix", k);
                if k == 1 {
                    result.blame_node(route, k)?;
                } else {
                    result.blame_pair_range(route, 0, k - 1)?;
                }
            }

            // Should not happen at all, so the reporter is at fault. An
            // undecodable failure from a known reporter lands here too.
            _ => {
                trace!("{:?} at position {} → blame reporter", failure, k);
                result.blame_node(route, k)?;
            }
        }

        Ok(())
    }

    /// Blame the channel into position `k`. There is no pair below our own
    /// channel and we trust ourselves, so our direct peer takes the blame.
    fn blame_incoming(
        &self,
        route: &Route,
        k: usize,
        result: &mut AttributionResult,
    ) -> Result<(), InvariantViolation> {
        if k == 1 {
            return result.blame_node(route, k);
        }
        result.blame_pair(route, k - 1)
    }
}
