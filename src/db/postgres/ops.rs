use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::error;

use crate::db::models::{IndexerCheckpoint, InvoiceStatus, WebhookSubscription};
use crate::db::postgres::PostgresClient;
use crate::db::store::{CheckpointStore, InvoiceStore, SubscriptionStore};

fn block_to_i64(block: u64) -> anyhow::Result<i64> {
    i64::try_from(block).with_context(|| format!("Block number {} exceeds BIGINT", block))
}

impl PostgresClient {
    // ==================== INVOICES ====================

    async fn set_terminal_status(
        &self,
        onchain_invoice_id: i64,
        status: InvoiceStatus,
        tx_hash: Option<&str>,
        paid_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64> {
        // Undeployed invoices carry a negative sentinel and must never match
        if onchain_invoice_id < 0 {
            return Ok(0);
        }

        let client = self.pool.get().await?;
        let query = r#"
            UPDATE indexer.invoices SET
                status = $2,
                paid_at = COALESCE($3, paid_at),
                tx_hash = COALESCE($4, tx_hash)
            WHERE onchain_invoice_id = $1
              AND status NOT IN ('paid', 'cancelled')
        "#;

        let changed = client
            .execute(query, &[&onchain_invoice_id, &status, &paid_at, &tx_hash])
            .await
            .map_err(|e| {
                error!(
                    "Failed to set status {:?} for on-chain invoice {}: {:?}",
                    status, onchain_invoice_id, e
                );
                e
            })?;

        Ok(changed)
    }
}

#[async_trait]
impl CheckpointStore for PostgresClient {
    async fn get_checkpoint(&self, key: &str) -> anyhow::Result<Option<IndexerCheckpoint>> {
        let client = self.pool.get().await?;
        let query = "SELECT key, last_block, updated_at FROM indexer.checkpoints WHERE key = $1";

        let row = client.query_opt(query, &[&key]).await?;

        row.map(|r| -> anyhow::Result<IndexerCheckpoint> {
            let last_block: i64 = r.get("last_block");
            Ok(IndexerCheckpoint {
                key: r.get("key"),
                last_block: u64::try_from(last_block)
                    .with_context(|| format!("Negative checkpoint {} for '{}'", last_block, key))?,
                updated_at: r.get("updated_at"),
            })
        })
        .transpose()
    }

    async fn init_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<u64> {
        let client = self.pool.get().await?;
        let last_block = block_to_i64(checkpoint.last_block)?;

        // No-op update so RETURNING yields the existing row when we lose the race
        let query = r#"
            INSERT INTO indexer.checkpoints (key, last_block, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET key = EXCLUDED.key
            RETURNING last_block
        "#;

        let row = client
            .query_one(query, &[&checkpoint.key, &last_block, &checkpoint.updated_at])
            .await?;
        let stored: i64 = row.get("last_block");

        u64::try_from(stored).with_context(|| format!("Negative checkpoint {}", stored))
    }

    async fn set_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let last_block = block_to_i64(checkpoint.last_block)?;
        let query = r#"
            INSERT INTO indexer.checkpoints (key, last_block, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                last_block = GREATEST(indexer.checkpoints.last_block, EXCLUDED.last_block),
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(query, &[&checkpoint.key, &last_block, &checkpoint.updated_at])
            .await
            .map_err(|e| {
                error!(
                    "Failed to write checkpoint '{}' at block {}: {:?}",
                    checkpoint.key, checkpoint.last_block, e
                );
                e
            })?;

        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for PostgresClient {
    async fn mark_invoices_paid(
        &self,
        onchain_invoice_id: i64,
        tx_hash: &str,
        paid_at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        self.set_terminal_status(
            onchain_invoice_id,
            InvoiceStatus::Paid,
            Some(tx_hash),
            Some(paid_at),
        )
        .await
    }

    async fn mark_invoices_cancelled(&self, onchain_invoice_id: i64) -> anyhow::Result<u64> {
        self.set_terminal_status(onchain_invoice_id, InvoiceStatus::Cancelled, None, None)
            .await
    }
}

#[async_trait]
impl SubscriptionStore for PostgresClient {
    async fn webhooks_for_event(&self, event: &str) -> anyhow::Result<Vec<WebhookSubscription>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT id, organization_id, url, subscribed_events
            FROM indexer.webhooks
            WHERE $1 = ANY(subscribed_events)
        "#;

        let rows = client.query(query, &[&event]).await?;
        let webhooks = rows
            .iter()
            .map(|row| WebhookSubscription {
                id: row.get("id"),
                organization_id: row.get("organization_id"),
                url: row.get("url"),
                subscribed_events: row.get("subscribed_events"),
            })
            .collect();

        Ok(webhooks)
    }
}
