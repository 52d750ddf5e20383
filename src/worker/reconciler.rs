use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use crate::{
    db::InvoiceStore,
    error::IndexerError,
    worker::events::{ChainEvent, EventKind, EventPayload},
};

/// What reconciling one event did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The event only triggers notifications.
    NotifyOnly,
    /// A status write was issued; `changed` invoices moved to the new status.
    StatusWritten { invoice_id: i64, changed: u64 },
}

/// Applies decoded events to local invoice state.
///
/// Status writes are conditional on the invoice not already being paid or
/// cancelled, so applying the same event twice leaves the same state.
pub struct Reconciler {
    invoices: Arc<dyn InvoiceStore>,
}

impl Reconciler {
    pub fn new(invoices: Arc<dyn InvoiceStore>) -> Self {
        Self { invoices }
    }

    pub async fn apply(&self, event: &ChainEvent) -> Result<Reconciliation, IndexerError> {
        let (invoice_id, result) = match &event.payload {
            EventPayload::Created { .. } | EventPayload::WithdrawalCompleted { .. } => {
                return Ok(Reconciliation::NotifyOnly);
            },
            EventPayload::Paid { invoice_id, .. } => (
                *invoice_id,
                self.invoices
                    .mark_invoices_paid(*invoice_id, &event.tx_hash, Utc::now())
                    .await,
            ),
            EventPayload::Cancelled { invoice_id } => (
                *invoice_id,
                self.invoices.mark_invoices_cancelled(*invoice_id).await,
            ),
        };

        let kind = event.kind();
        let changed = result.map_err(|e| IndexerError::ReconcileFailed {
            kind,
            invoice_id,
            reason: format!("{:#}", e),
        })?;

        if changed > 0 {
            info!(
                "Marked {} invoice(s) with on-chain id {} as {} (block {})",
                changed,
                invoice_id,
                status_word(kind),
                event.block_number
            );
        } else {
            debug!(
                "{} for on-chain invoice {} matched no open invoices",
                kind, invoice_id
            );
        }

        Ok(Reconciliation::StatusWritten {
            invoice_id,
            changed,
        })
    }
}

fn status_word(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Paid => "paid",
        EventKind::Cancelled => "cancelled",
        _ => "unchanged",
    }
}
