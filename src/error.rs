//! Error types for the indexing pipeline.

use thiserror::Error;

use crate::utils::is_rate_limit_signal;
use crate::worker::EventKind;

/// Error reported by the remote ledger for a single RPC call.
///
/// Keeps the JSON-RPC error code (when the node sent one) so rate-limit
/// detection does not depend on the transport's message formatting.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LedgerError {
    pub code: Option<i64>,
    pub message: String,
    /// HTTP status when the failure happened below the JSON-RPC layer.
    pub http_status: Option<u16>,
}

impl LedgerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            http_status: None,
        }
    }

    /// Returns `true` if the node asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        self.http_status == Some(429) || is_rate_limit_signal(self.code, &self.message)
    }
}

/// Errors that can abort an indexer pass.
///
/// Webhook delivery failures are deliberately absent: they are logged by the
/// dispatcher and never reach the pass.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Rate limited on {kind} [{from}-{to}] after {retries} retries: {source}")]
    RateLimited {
        kind: EventKind,
        from: u64,
        to: u64,
        retries: u32,
        #[source]
        source: LedgerError,
    },

    /// The range was abandoned; `source` is the last ledger failure.
    #[error("Failed to fetch {kind} logs for [{from}-{to}]: {source}")]
    FetchFailed {
        kind: EventKind,
        from: u64,
        to: u64,
        #[source]
        source: Box<IndexerError>,
    },

    #[error("Failed to decode {kind} log in tx {tx_hash}: {reason}")]
    Decode {
        kind: EventKind,
        tx_hash: String,
        reason: String,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Reconciliation failed for {kind} invoice {invoice_id}: {reason}")]
    ReconcileFailed {
        kind: EventKind,
        invoice_id: i64,
        reason: String,
    },

    #[error("Webhook subscription lookup failed for {event}: {reason}")]
    SubscriptionLookup { event: String, reason: String },

    #[error("Checkpoint error for '{key}': {reason}")]
    Checkpoint { key: String, reason: String },
}

impl IndexerError {
    /// Returns `true` if the error, or the failure behind it, is a rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Ledger(err) => err.is_rate_limited(),
            Self::FetchFailed { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }
}
