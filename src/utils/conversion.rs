//! Type conversion and formatting utilities.
//!
//! Amounts leave the indexer as decimal strings so subscribers never lose
//! precision on 256-bit values.

use alloy::primitives::{hex, U256};
use serde::Serializer;

// ============================================
// Hex Encoding
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ============================================
// U256 Conversions
// ============================================

/// Convert an on-chain invoice id to the correlation id stored off-chain.
///
/// Returns `None` when the id does not fit in a signed 64-bit column.
/// Real ids are always `>= 0`, so the result never equals the `-1` sentinel.
pub fn u256_to_invoice_id(value: U256) -> Option<i64> {
    i64::try_from(value).ok()
}

/// Serde helper writing a U256 as a base-10 string.
pub fn serialize_decimal<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}
