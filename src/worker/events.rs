//! Typed chain events for the InvoicePayments contract.
//!
//! Each RPC log is decoded once into a [`ChainEvent`] so the reconciler and
//! the webhook dispatcher work on plain Rust values instead of raw topics.

use std::fmt;

use alloy::{
    primitives::{B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{
    abis::invoice_payments,
    error::IndexerError,
    utils::{hex_encode, u256_to_invoice_id},
};

/// The four contract events the indexer follows, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Paid,
    Cancelled,
    WithdrawalCompleted,
}

impl EventKind {
    /// Fetch and processing order within one pass.
    pub const ALL: [EventKind; 4] = [
        EventKind::Created,
        EventKind::Paid,
        EventKind::Cancelled,
        EventKind::WithdrawalCompleted,
    ];

    /// Label used in webhook payloads and subscription sets.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Created => "invoice.created",
            EventKind::Paid => "invoice.paid",
            EventKind::Cancelled => "invoice.cancelled",
            EventKind::WithdrawalCompleted => "withdrawal.completed",
        }
    }

    /// topic0 of the contract event.
    pub fn signature_hash(self) -> B256 {
        match self {
            EventKind::Created => invoice_payments::InvoiceCreated::SIGNATURE_HASH,
            EventKind::Paid => invoice_payments::InvoicePaid::SIGNATURE_HASH,
            EventKind::Cancelled => invoice_payments::InvoiceCancelled::SIGNATURE_HASH,
            EventKind::WithdrawalCompleted => invoice_payments::Withdrawal::SIGNATURE_HASH,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific fields of a decoded event.
///
/// Addresses are kept as the checksummed strings the node reports; amounts
/// stay full-width so nothing is rounded before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Created {
        invoice_id: i64,
        creator: String,
        token: String,
        amount: U256,
    },
    Paid {
        invoice_id: i64,
        payer: String,
        amount: U256,
    },
    Cancelled {
        invoice_id: i64,
    },
    WithdrawalCompleted {
        user: String,
        token: String,
        amount: U256,
    },
}

/// One decoded log. Has no identity beyond its position in the chain, so the
/// same event may be seen again when a block range is re-fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: String,
    pub payload: EventPayload,
}

impl ChainEvent {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Created { .. } => EventKind::Created,
            EventPayload::Paid { .. } => EventKind::Paid,
            EventPayload::Cancelled { .. } => EventKind::Cancelled,
            EventPayload::WithdrawalCompleted { .. } => EventKind::WithdrawalCompleted,
        }
    }

    /// Decode an RPC log that was queried with `kind`'s topic0.
    pub fn decode(kind: EventKind, log: &Log) -> Result<Self, IndexerError> {
        let tx_hash = log
            .transaction_hash
            .map(|h| hex_encode(h.as_slice()))
            .unwrap_or_default();

        let decode_err = |reason: String| IndexerError::Decode {
            kind,
            tx_hash: tx_hash.clone(),
            reason,
        };

        let block_number = log
            .block_number
            .ok_or_else(|| decode_err("log has no block number (pending?)".to_string()))?;
        let log_index = log.log_index.unwrap_or_default();

        let invoice_id = |value: U256| {
            u256_to_invoice_id(value)
                .ok_or_else(|| decode_err(format!("invoice id {} out of range", value)))
        };

        let data = log.data();
        let payload = match kind {
            EventKind::Created => {
                let event = invoice_payments::InvoiceCreated::decode_log_data(data)
                    .map_err(|e| decode_err(e.to_string()))?;
                EventPayload::Created {
                    invoice_id: invoice_id(event.invoiceId)?,
                    creator: event.creator.to_string(),
                    token: event.token.to_string(),
                    amount: event.amount,
                }
            },
            EventKind::Paid => {
                let event = invoice_payments::InvoicePaid::decode_log_data(data)
                    .map_err(|e| decode_err(e.to_string()))?;
                EventPayload::Paid {
                    invoice_id: invoice_id(event.invoiceId)?,
                    payer: event.payer.to_string(),
                    amount: event.amount,
                }
            },
            EventKind::Cancelled => {
                let event = invoice_payments::InvoiceCancelled::decode_log_data(data)
                    .map_err(|e| decode_err(e.to_string()))?;
                EventPayload::Cancelled {
                    invoice_id: invoice_id(event.invoiceId)?,
                }
            },
            EventKind::WithdrawalCompleted => {
                let event = invoice_payments::Withdrawal::decode_log_data(data)
                    .map_err(|e| decode_err(e.to_string()))?;
                EventPayload::WithdrawalCompleted {
                    user: event.user.to_string(),
                    token: event.token.to_string(),
                    amount: event.amount,
                }
            },
        };

        Ok(Self {
            block_number,
            log_index,
            tx_hash,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address, LogData};

    const CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const PAYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

    fn rpc_log(data: LogData, block_number: Option<u64>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: CONTRACT,
                data,
            },
            block_number,
            log_index: Some(3),
            transaction_hash: Some(B256::repeat_byte(0xab)),
            ..Default::default()
        }
    }

    #[test]
    fn test_labels_and_order() {
        let labels: Vec<&str> = EventKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            [
                "invoice.created",
                "invoice.paid",
                "invoice.cancelled",
                "withdrawal.completed"
            ]
        );
    }

    #[test]
    fn test_decode_paid() {
        let data = invoice_payments::InvoicePaid {
            invoiceId: U256::from(7u64),
            payer: PAYER,
            amount: U256::from(1_500_000u64),
        }
        .encode_log_data();

        let event = ChainEvent::decode(EventKind::Paid, &rpc_log(data, Some(120))).unwrap();

        assert_eq!(event.kind(), EventKind::Paid);
        assert_eq!(event.block_number, 120);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.tx_hash, format!("0x{}", "ab".repeat(32)));
        assert_eq!(
            event.payload,
            EventPayload::Paid {
                invoice_id: 7,
                payer: PAYER.to_string(),
                amount: U256::from(1_500_000u64),
            }
        );
    }

    #[test]
    fn test_decode_with_wrong_kind_fails() {
        let data = invoice_payments::InvoiceCancelled {
            invoiceId: U256::from(1u64),
        }
        .encode_log_data();

        let err = ChainEvent::decode(EventKind::Paid, &rpc_log(data, Some(1))).unwrap_err();
        assert!(matches!(err, IndexerError::Decode { kind: EventKind::Paid, .. }));
    }

    #[test]
    fn test_decode_rejects_pending_log() {
        let data = invoice_payments::InvoiceCancelled {
            invoiceId: U256::from(1u64),
        }
        .encode_log_data();

        let err = ChainEvent::decode(EventKind::Cancelled, &rpc_log(data, None)).unwrap_err();
        assert!(matches!(err, IndexerError::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_invoice_id() {
        let data = invoice_payments::InvoiceCancelled {
            invoiceId: U256::MAX,
        }
        .encode_log_data();

        let err = ChainEvent::decode(EventKind::Cancelled, &rpc_log(data, Some(1))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
