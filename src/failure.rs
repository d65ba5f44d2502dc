//! Onion failure taxonomy
//!
//! The closed set of failures a node along the route can report back to us,
//! aligned one-to-one with the BOLT 4 failure codes. Decoding the encrypted
//! error packet happens upstream; this module only names what was decoded.

use crate::error::AttributionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unparsable onion, reported by the node that could not parse it
pub const BADONION: u16 = 0x8000;
/// Permanent failure
pub const PERM: u16 = 0x4000;
/// Node failure (rather than channel failure)
pub const NODE: u16 = 0x2000;
/// Failure carries a channel update
pub const UPDATE: u16 = 0x1000;

/// Failure reported by a node along the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureVariant {
    InvalidOnionVersion,
    InvalidOnionHmac,
    InvalidOnionKey,
    UnknownNextPeer,
    PermanentChannelFailure,
    AmountBelowMinimum,
    FeeInsufficient,
    IncorrectCltvExpiry,
    ChannelDisabled,
    TemporaryChannelFailure,
    ExpiryTooSoon,
    FinalIncorrectCltvExpiry,
    FinalIncorrectHtlcAmount,
    IncorrectPaymentAmount,
    IncorrectDetails,
    FinalExpiryTooSoon,
    /// Any other failure, with its raw wire code
    Other(u16),
}

impl FailureVariant {
    /// Map a BOLT 4 failure code to a variant
    ///
    /// Codes without a dedicated variant become `Other`.
    pub fn from_code(code: u16) -> Self {
        match code {
            c if c == BADONION | PERM | 4 => FailureVariant::InvalidOnionVersion,
            c if c == BADONION | PERM | 5 => FailureVariant::InvalidOnionHmac,
            c if c == BADONION | PERM | 6 => FailureVariant::InvalidOnionKey,
            c if c == UPDATE | 7 => FailureVariant::TemporaryChannelFailure,
            c if c == PERM | 8 => FailureVariant::PermanentChannelFailure,
            c if c == PERM | 10 => FailureVariant::UnknownNextPeer,
            c if c == UPDATE | 11 => FailureVariant::AmountBelowMinimum,
            c if c == UPDATE | 12 => FailureVariant::FeeInsufficient,
            c if c == UPDATE | 13 => FailureVariant::IncorrectCltvExpiry,
            c if c == UPDATE | 14 => FailureVariant::ExpiryTooSoon,
            c if c == PERM | 15 => FailureVariant::IncorrectDetails,
            c if c == PERM | 16 => FailureVariant::IncorrectPaymentAmount,
            17 => FailureVariant::FinalExpiryTooSoon,
            18 => FailureVariant::FinalIncorrectCltvExpiry,
            19 => FailureVariant::FinalIncorrectHtlcAmount,
            c if c == UPDATE | 20 => FailureVariant::ChannelDisabled,
            other => FailureVariant::Other(other),
        }
    }

    /// BOLT 4 failure code of this variant
    pub fn code(&self) -> u16 {
        match self {
            FailureVariant::InvalidOnionVersion => BADONION | PERM | 4,
            FailureVariant::InvalidOnionHmac => BADONION | PERM | 5,
            FailureVariant::InvalidOnionKey => BADONION | PERM | 6,
            FailureVariant::TemporaryChannelFailure => UPDATE | 7,
            FailureVariant::PermanentChannelFailure => PERM | 8,
            FailureVariant::UnknownNextPeer => PERM | 10,
            FailureVariant::AmountBelowMinimum => UPDATE | 11,
            FailureVariant::FeeInsufficient => UPDATE | 12,
            FailureVariant::IncorrectCltvExpiry => UPDATE | 13,
            FailureVariant::ExpiryTooSoon => UPDATE | 14,
            FailureVariant::IncorrectDetails => PERM | 15,
            FailureVariant::IncorrectPaymentAmount => PERM | 16,
            FailureVariant::FinalExpiryTooSoon => 17,
            FailureVariant::FinalIncorrectCltvExpiry => 18,
            FailureVariant::FinalIncorrectHtlcAmount => 19,
            FailureVariant::ChannelDisabled => UPDATE | 20,
            FailureVariant::Other(code) => *code,
        }
    }

    /// Invalid onion version, HMAC or ephemeral key
    pub fn is_malformed_onion(&self) -> bool {
        matches!(
            self,
            FailureVariant::InvalidOnionVersion
                | FailureVariant::InvalidOnionHmac
                | FailureVariant::InvalidOnionKey
        )
    }

    /// HTLC did not satisfy the forwarding policy the node advertises
    pub fn is_policy_mismatch(&self) -> bool {
        matches!(
            self,
            FailureVariant::AmountBelowMinimum
                | FailureVariant::FeeInsufficient
                | FailureVariant::IncorrectCltvExpiry
                | FailureVariant::ChannelDisabled
        )
    }

    /// Snake-case name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            FailureVariant::InvalidOnionVersion => "invalid_onion_version",
            FailureVariant::InvalidOnionHmac => "invalid_onion_hmac",
            FailureVariant::InvalidOnionKey => "invalid_onion_key",
            FailureVariant::UnknownNextPeer => "unknown_next_peer",
            FailureVariant::PermanentChannelFailure => "permanent_channel_failure",
            FailureVariant::AmountBelowMinimum => "amount_below_minimum",
            FailureVariant::FeeInsufficient => "fee_insufficient",
            FailureVariant::IncorrectCltvExpiry => "incorrect_cltv_expiry",
            FailureVariant::ChannelDisabled => "channel_disabled",
            FailureVariant::TemporaryChannelFailure => "temporary_channel_failure",
            FailureVariant::ExpiryTooSoon => "expiry_too_soon",
            FailureVariant::FinalIncorrectCltvExpiry => "final_incorrect_cltv_expiry",
            FailureVariant::FinalIncorrectHtlcAmount => "final_incorrect_htlc_amount",
            FailureVariant::IncorrectPaymentAmount => "incorrect_payment_amount",
            FailureVariant::IncorrectDetails => "incorrect_details",
            FailureVariant::FinalExpiryTooSoon => "final_expiry_too_soon",
            FailureVariant::Other(_) => "other",
        }
    }
}

impl fmt::Display for FailureVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.name(), self.code())
    }
}

/// Parse a failure from its name (snake or kebab case) or its numeric code
/// (decimal or `0x` hex)
impl FromStr for FailureVariant {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");

        if let Some(hex_code) = normalized.strip_prefix("0x") {
            return u16::from_str_radix(hex_code, 16)
                .map(FailureVariant::from_code)
                .map_err(|e| AttributionError::UnknownFailure(format!("{}: {}", s, e)));
        }
        if let Ok(code) = normalized.parse::<u16>() {
            return Ok(FailureVariant::from_code(code));
        }

        let variant = match normalized.as_str() {
            "invalid_onion_version" => FailureVariant::InvalidOnionVersion,
            "invalid_onion_hmac" => FailureVariant::InvalidOnionHmac,
            "invalid_onion_key" => FailureVariant::InvalidOnionKey,
            "unknown_next_peer" => FailureVariant::UnknownNextPeer,
            "permanent_channel_failure" => FailureVariant::PermanentChannelFailure,
            "amount_below_minimum" => FailureVariant::AmountBelowMinimum,
            "fee_insufficient" => FailureVariant::FeeInsufficient,
            "incorrect_cltv_expiry" => FailureVariant::IncorrectCltvExpiry,
            "channel_disabled" => FailureVariant::ChannelDisabled,
            "temporary_channel_failure" => FailureVariant::TemporaryChannelFailure,
            "expiry_too_soon" => FailureVariant::ExpiryTooSoon,
            "final_incorrect_cltv_expiry" => FailureVariant::FinalIncorrectCltvExpiry,
            "final_incorrect_htlc_amount" => FailureVariant::FinalIncorrectHtlcAmount,
            "incorrect_payment_amount" => FailureVariant::IncorrectPaymentAmount,
            "incorrect_details" | "incorrect_or_unknown_payment_details" => {
                FailureVariant::IncorrectDetails
            }
            "final_expiry_too_soon" => FailureVariant::FinalExpiryTooSoon,
            _ => return Err(AttributionError::UnknownFailure(s.to_string())),
        };

        Ok(variant)
    }
}
