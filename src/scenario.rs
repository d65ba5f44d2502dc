//! Failed attempt descriptions as handed over by a payment executor
//!
//! A scenario is the JSON form of one classifier call: the route, the raw
//! failure source index and the decoded failure, if any.

use crate::classifier::{FailureClassifier, Origin};
use crate::error::AttributionError;
use crate::failure::FailureVariant;
use crate::result::AttributionResult;
use crate::route::Route;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Failure given either by name or by BOLT 4 code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureInput {
    Code(u16),
    Name(String),
}

impl FailureInput {
    /// Resolve to a failure variant
    pub fn resolve(&self) -> Result<FailureVariant, AttributionError> {
        match self {
            FailureInput::Code(code) => Ok(FailureVariant::from_code(*code)),
            FailureInput::Name(name) => name.parse(),
        }
    }
}

/// One failed payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Route the attempt took
    pub route: Route,
    /// Position of the node that reported the failure, absent when unknown
    #[serde(default)]
    pub failure_source_index: Option<usize>,
    /// Decoded failure, absent when nothing could be decoded
    #[serde(default)]
    pub failure: Option<FailureInput>,
}

impl Scenario {
    /// Origin of the failure within the route
    pub fn origin(&self) -> Result<Origin, AttributionError> {
        Origin::from_source_index(self.failure_source_index, self.route.hop_count())
    }

    /// Decoded failure variant
    pub fn failure(&self) -> Result<Option<FailureVariant>, AttributionError> {
        self.failure.as_ref().map(FailureInput::resolve).transpose()
    }

    /// Run the classifier on this scenario
    pub fn classify(
        &self,
        classifier: &FailureClassifier,
    ) -> Result<AttributionResult, AttributionError> {
        let origin = self.origin()?;
        let failure = self.failure()?;

        debug!(
            "Classifying scenario: hops={}, origin={:?}, failure={:?}",
            self.route.hop_count(),
            origin,
            failure
        );

        // Origins built from the route always fit it
        classifier
            .try_classify(&self.route, origin, failure)
            .map_err(|e| AttributionError::InvalidOrigin(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FinalFailureReason;
    use crate::vertex::{Vertex, VERTEX_LEN};

    fn vertex_hex(tag: u8) -> String {
        let mut bytes = [0u8; VERTEX_LEN];
        bytes[0] = 3;
        bytes[1] = tag;
        Vertex::from(bytes).to_string()
    }

    fn scenario_json(index: &str, failure: &str) -> String {
        format!(
            r#"{{
                "route": {{
                    "source_pub_key": "{}",
                    "total_amount": 1000,
                    "hops": [
                        {{ "pub_key_bytes": "{}", "channel_id": 7, "amt_to_forward": 990 }},
                        {{ "pub_key_bytes": "{}", "amt_to_forward": 980 }}
                    ]
                }},
                "failure_source_index": {},
                "failure": {}
            }}"#,
            vertex_hex(0),
            vertex_hex(1),
            vertex_hex(2),
            index,
            failure
        )
    }

    #[test]
    fn test_named_failure() {
        let scenario: Scenario =
            serde_json::from_str(&scenario_json("1", r#""temporary_channel_failure""#)).unwrap();

        assert_eq!(scenario.origin().unwrap(), Origin::Intermediate(1));
        let result = scenario.classify(&FailureClassifier::new()).unwrap();
        assert_eq!(result.blamed_pairs().len(), 1);
        assert_eq!(result.blamed_pairs()[0].1, 990);
    }

    #[test]
    fn test_coded_failure() {
        // incorrect_or_unknown_payment_details
        let scenario: Scenario = serde_json::from_str(&scenario_json("2", "16399")).unwrap();

        let result = scenario.classify(&FailureClassifier::new()).unwrap();
        assert_eq!(
            result.final_failure_reason,
            Some(FinalFailureReason::IncorrectPaymentDetails)
        );
    }

    #[test]
    fn test_unknown_outcome() {
        let scenario: Scenario = serde_json::from_str(&scenario_json("null", "null")).unwrap();

        assert_eq!(scenario.origin().unwrap(), Origin::Unknown);
        let result = scenario.classify(&FailureClassifier::new()).unwrap();
        assert_eq!(result.pair_results.len(), 4);
    }

    #[test]
    fn test_bad_inputs() {
        let out_of_range: Scenario =
            serde_json::from_str(&scenario_json("3", r#""expiry_too_soon""#)).unwrap();
        assert!(matches!(
            out_of_range.classify(&FailureClassifier::new()),
            Err(AttributionError::InvalidOrigin(_))
        ));

        let bad_name: Scenario =
            serde_json::from_str(&scenario_json("1", r#""no_such_failure""#)).unwrap();
        assert!(matches!(
            bad_name.classify(&FailureClassifier::new()),
            Err(AttributionError::UnknownFailure(_))
        ));
    }
}
