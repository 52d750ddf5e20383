//! Utility functions for the invoice indexer.
//!
//! - [`conversion`] - Hex encoding and U256 conversions for wire payloads
//! - [`rate_limit`] - Classification of RPC "slow down" responses

mod conversion;
mod rate_limit;

// Conversion utilities
pub use conversion::{hex_encode, serialize_decimal, u256_to_invoice_id};

// Rate-limit classification
pub use rate_limit::{is_rate_limit_signal, RATE_LIMIT_ERROR_CODE};
