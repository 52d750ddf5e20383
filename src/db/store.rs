//! Persistence contracts consumed by the indexer.
//!
//! The indexer only needs a checkpoint, a bulk status update and a
//! subscription lookup. [`PostgresClient`](super::PostgresClient) implements
//! them for production and [`MemoryStore`](super::MemoryStore) for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{IndexerCheckpoint, WebhookSubscription};

/// Reads and writes the named block watermark.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint for `key` (returns `None` if none exists).
    async fn get_checkpoint(&self, key: &str) -> anyhow::Result<Option<IndexerCheckpoint>>;

    /// Insert the checkpoint if absent and return the value actually stored.
    async fn init_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<u64>;

    /// Upsert the checkpoint. The stored block never moves backwards.
    async fn set_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<()>;
}

/// Bulk conditional status writes keyed by on-chain correlation id.
///
/// Both updates skip invoices already in a terminal status, so replaying an
/// event is a no-op. They return the number of invoices changed.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn mark_invoices_paid(
        &self,
        onchain_invoice_id: i64,
        tx_hash: &str,
        paid_at: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    async fn mark_invoices_cancelled(&self, onchain_invoice_id: i64) -> anyhow::Result<u64>;
}

/// Read-only access to webhook subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscriptions whose subscribed event set contains `event`.
    async fn webhooks_for_event(&self, event: &str) -> anyhow::Result<Vec<WebhookSubscription>>;
}
