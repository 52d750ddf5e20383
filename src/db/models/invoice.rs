use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Correlation id of an invoice with no on-chain counterpart yet.
///
/// Real contract ids start at 0, so a negative value can never be matched
/// by a chain event.
pub const UNDEPLOYED_ONCHAIN_ID: i64 = -1;

/// Invoice lifecycle: `draft -> deployed -> paid`, or `draft/deployed -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "invoice_status")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[postgres(name = "draft")]
    Draft,
    #[postgres(name = "deployed")]
    Deployed,
    #[postgres(name = "paid")]
    Paid,
    #[postgres(name = "cancelled")]
    Cancelled,
}

impl InvoiceStatus {
    /// Paid and cancelled invoices are never reopened by later events.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

/// Invoice record (PostgreSQL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub organization_id: String,
    pub onchain_invoice_id: i64,
    pub creator_wallet: String,
    pub token: String,
    pub amount: String,
    pub status: InvoiceStatus,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Insert payload for the invoice creation path.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub organization_id: String,
    pub onchain_invoice_id: i64,
    pub creator_wallet: String,
    pub token: String,
    pub amount: String,
    pub status: InvoiceStatus,
    pub tx_hash: Option<String>,
}

impl NewInvoice {
    /// Build an invoice, deciding its correlation id and initial status.
    ///
    /// The on-chain id is only trusted when a deployment transaction hash is
    /// present; everything else is stored as [`UNDEPLOYED_ONCHAIN_ID`] so
    /// drafts never collide with contract id 0.
    pub fn new(
        organization_id: impl Into<String>,
        creator_wallet: impl Into<String>,
        token: impl Into<String>,
        amount: impl Into<String>,
        onchain_invoice_id: Option<i64>,
        tx_hash: Option<&str>,
    ) -> Self {
        let tx_hash = tx_hash
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);

        let onchain_invoice_id = match (tx_hash.as_ref(), onchain_invoice_id) {
            (Some(_), Some(id)) if id >= 0 => id,
            _ => UNDEPLOYED_ONCHAIN_ID,
        };

        let status = if tx_hash.is_some() {
            InvoiceStatus::Deployed
        } else {
            InvoiceStatus::Draft
        };

        Self {
            organization_id: organization_id.into(),
            onchain_invoice_id,
            creator_wallet: creator_wallet.into(),
            token: token.into(),
            amount: amount.into(),
            status,
            tx_hash,
        }
    }
}
