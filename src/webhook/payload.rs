use alloy::primitives::U256;
use serde::Serialize;

use crate::{
    utils::serialize_decimal,
    worker::{ChainEvent, EventPayload},
};

/// JSON body POSTed to subscribers: `{"event": "<label>", ...fields}`.
///
/// Amounts are decimal strings; addresses are passed through as reported by
/// the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum WebhookBody {
    #[serde(rename = "invoice.created", rename_all = "camelCase")]
    InvoiceCreated {
        invoice_id: i64,
        creator: String,
        token: String,
        #[serde(serialize_with = "serialize_decimal")]
        amount: U256,
    },
    #[serde(rename = "invoice.paid", rename_all = "camelCase")]
    InvoicePaid {
        invoice_id: i64,
        payer: String,
        #[serde(serialize_with = "serialize_decimal")]
        amount: U256,
        tx_hash: String,
    },
    #[serde(rename = "invoice.cancelled", rename_all = "camelCase")]
    InvoiceCancelled { invoice_id: i64 },
    #[serde(rename = "withdrawal.completed", rename_all = "camelCase")]
    WithdrawalCompleted {
        user: String,
        token: String,
        #[serde(serialize_with = "serialize_decimal")]
        amount: U256,
    },
}

impl From<&ChainEvent> for WebhookBody {
    fn from(event: &ChainEvent) -> Self {
        match &event.payload {
            EventPayload::Created {
                invoice_id,
                creator,
                token,
                amount,
            } => WebhookBody::InvoiceCreated {
                invoice_id: *invoice_id,
                creator: creator.clone(),
                token: token.clone(),
                amount: *amount,
            },
            EventPayload::Paid {
                invoice_id,
                payer,
                amount,
            } => WebhookBody::InvoicePaid {
                invoice_id: *invoice_id,
                payer: payer.clone(),
                amount: *amount,
                tx_hash: event.tx_hash.clone(),
            },
            EventPayload::Cancelled { invoice_id } => WebhookBody::InvoiceCancelled {
                invoice_id: *invoice_id,
            },
            EventPayload::WithdrawalCompleted {
                user,
                token,
                amount,
            } => WebhookBody::WithdrawalCompleted {
                user: user.clone(),
                token: token.clone(),
                amount: *amount,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cancelled, created, paid, withdrawal, PAYER, TOKEN};
    use serde_json::json;

    #[test]
    fn test_paid_body_shape() {
        let event = paid(42, 7);
        let body = serde_json::to_value(WebhookBody::from(&event)).unwrap();
        assert_eq!(
            body,
            json!({
                "event": "invoice.paid",
                "invoiceId": 7,
                "payer": PAYER,
                "amount": "1000",
                "txHash": event.tx_hash,
            })
        );
    }

    #[test]
    fn test_created_body_shape() {
        let body = serde_json::to_value(WebhookBody::from(&created(1, 3))).unwrap();
        assert_eq!(
            body,
            json!({
                "event": "invoice.created",
                "invoiceId": 3,
                "creator": PAYER,
                "token": TOKEN,
                "amount": "1000",
            })
        );
    }

    #[test]
    fn test_cancelled_and_withdrawal_labels() {
        let cancelled = serde_json::to_value(WebhookBody::from(&cancelled(1, 5))).unwrap();
        assert_eq!(cancelled, json!({"event": "invoice.cancelled", "invoiceId": 5}));

        let withdrawal = serde_json::to_value(WebhookBody::from(&withdrawal(1))).unwrap();
        assert_eq!(withdrawal["event"], "withdrawal.completed");
        assert_eq!(withdrawal["user"], PAYER);
        assert_eq!(withdrawal["amount"], "250");
    }
}
