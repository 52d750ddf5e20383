//! In-memory store for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{
    IndexerCheckpoint, Invoice, InvoiceStatus, NewInvoice, WebhookSubscription,
};
use crate::db::store::{CheckpointStore, InvoiceStore, SubscriptionStore};

/// A panic while a test held a lock leaves the data usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of every persistence contract.
///
/// Follows the same conditional-update rules as the PostgreSQL queries so
/// reconciliation behaves identically against either backend.
#[derive(Default)]
pub struct MemoryStore {
    checkpoints: Mutex<HashMap<String, IndexerCheckpoint>>,
    invoices: Mutex<Vec<Invoice>>,
    webhooks: Mutex<Vec<WebhookSubscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an invoice and return its internal id.
    pub fn insert_invoice(&self, invoice: NewInvoice) -> i64 {
        let mut invoices = lock(&self.invoices);
        let id = invoices.len() as i64 + 1;
        invoices.push(Invoice {
            id,
            organization_id: invoice.organization_id,
            onchain_invoice_id: invoice.onchain_invoice_id,
            creator_wallet: invoice.creator_wallet,
            token: invoice.token,
            amount: invoice.amount,
            status: invoice.status,
            tx_hash: invoice.tx_hash,
            created_at: Utc::now(),
            paid_at: None,
        });
        id
    }

    pub fn invoice(&self, id: i64) -> Option<Invoice> {
        lock(&self.invoices)
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn insert_webhook(
        &self,
        organization_id: &str,
        url: &str,
        subscribed_events: &[&str],
    ) -> i64 {
        let mut webhooks = lock(&self.webhooks);
        let id = webhooks.len() as i64 + 1;
        webhooks.push(WebhookSubscription {
            id,
            organization_id: organization_id.to_string(),
            url: url.to_string(),
            subscribed_events: subscribed_events.iter().map(|e| e.to_string()).collect(),
        });
        id
    }

    /// Current watermark for `key`, if any.
    pub fn last_block(&self, key: &str) -> Option<u64> {
        lock(&self.checkpoints)
            .get(key)
            .map(|c| c.last_block)
    }

    fn update_where<F>(&self, onchain_invoice_id: i64, apply: F) -> u64
    where
        F: Fn(&mut Invoice),
    {
        if onchain_invoice_id < 0 {
            return 0;
        }
        let mut invoices = lock(&self.invoices);
        let mut changed = 0;
        for invoice in invoices
            .iter_mut()
            .filter(|i| i.onchain_invoice_id == onchain_invoice_id && !i.status.is_terminal())
        {
            apply(invoice);
            changed += 1;
        }
        changed
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn get_checkpoint(&self, key: &str) -> anyhow::Result<Option<IndexerCheckpoint>> {
        Ok(lock(&self.checkpoints).get(key).cloned())
    }

    async fn init_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<u64> {
        let mut checkpoints = lock(&self.checkpoints);
        let stored = checkpoints
            .entry(checkpoint.key.clone())
            .or_insert_with(|| checkpoint.clone());
        Ok(stored.last_block)
    }

    async fn set_checkpoint(&self, checkpoint: &IndexerCheckpoint) -> anyhow::Result<()> {
        let mut checkpoints = lock(&self.checkpoints);
        match checkpoints.get_mut(&checkpoint.key) {
            Some(existing) => {
                existing.last_block = existing.last_block.max(checkpoint.last_block);
                existing.updated_at = checkpoint.updated_at;
            },
            None => {
                checkpoints.insert(checkpoint.key.clone(), checkpoint.clone());
            },
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn mark_invoices_paid(
        &self,
        onchain_invoice_id: i64,
        tx_hash: &str,
        paid_at: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        Ok(self.update_where(onchain_invoice_id, |invoice| {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at = Some(paid_at);
            invoice.tx_hash = Some(tx_hash.to_string());
        }))
    }

    async fn mark_invoices_cancelled(&self, onchain_invoice_id: i64) -> anyhow::Result<u64> {
        Ok(self.update_where(onchain_invoice_id, |invoice| {
            invoice.status = InvoiceStatus::Cancelled;
        }))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn webhooks_for_event(&self, event: &str) -> anyhow::Result<Vec<WebhookSubscription>> {
        Ok(lock(&self.webhooks)
            .iter()
            .filter(|w| w.is_subscribed_to(event))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed(store: &MemoryStore, onchain_id: i64) -> i64 {
        store.insert_invoice(NewInvoice::new(
            "org",
            "0xcreator",
            "0xtoken",
            "100",
            Some(onchain_id),
            Some("0xdeploy"),
        ))
    }

    #[tokio::test]
    async fn checkpoint_never_moves_backwards() {
        let store = MemoryStore::new();
        store
            .set_checkpoint(&IndexerCheckpoint::new("k", 500))
            .await
            .unwrap();
        store
            .set_checkpoint(&IndexerCheckpoint::new("k", 400))
            .await
            .unwrap();
        assert_eq!(store.last_block("k"), Some(500));
    }

    #[tokio::test]
    async fn init_checkpoint_keeps_first_value() {
        let store = MemoryStore::new();
        let first = store
            .init_checkpoint(&IndexerCheckpoint::new("k", 10))
            .await
            .unwrap();
        let second = store
            .init_checkpoint(&IndexerCheckpoint::new("k", 99))
            .await
            .unwrap();
        assert_eq!(first, 10);
        assert_eq!(second, 10);
    }

    #[tokio::test]
    async fn paid_is_not_reopened_by_cancel() {
        let store = MemoryStore::new();
        let id = deployed(&store, 3);

        let changed = store.mark_invoices_paid(3, "0xpay", Utc::now()).await.unwrap();
        assert_eq!(changed, 1);

        let changed = store.mark_invoices_cancelled(3).await.unwrap();
        assert_eq!(changed, 0);
        assert_eq!(store.invoice(id).unwrap().status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn sentinel_is_never_matched() {
        let store = MemoryStore::new();
        let draft = store.insert_invoice(NewInvoice::new(
            "org", "0xcreator", "0xtoken", "1", None, None,
        ));
        let changed = store.mark_invoices_paid(-1, "0xpay", Utc::now()).await.unwrap();
        assert_eq!(changed, 0);
        assert_eq!(store.invoice(draft).unwrap().status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn poisoned_lock_keeps_serving() {
        let store = MemoryStore::new();
        store
            .set_checkpoint(&IndexerCheckpoint::new("k", 7))
            .await
            .unwrap();

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.checkpoints.lock().unwrap();
            panic!("writer died");
        }));
        assert!(poisoned.is_err());
        assert!(store.checkpoints.is_poisoned());

        store
            .set_checkpoint(&IndexerCheckpoint::new("k", 9))
            .await
            .unwrap();
        assert_eq!(store.last_block("k"), Some(9));
    }

    #[tokio::test]
    async fn webhook_filter_by_membership() {
        let store = MemoryStore::new();
        store.insert_webhook("org", "https://a.example", &["invoice.paid"]);
        store.insert_webhook("org", "https://b.example", &["invoice.created", "invoice.paid"]);

        let paid = store.webhooks_for_event("invoice.paid").await.unwrap();
        assert_eq!(paid.len(), 2);

        let created = store.webhooks_for_event("invoice.created").await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].url, "https://b.example");
    }
}
