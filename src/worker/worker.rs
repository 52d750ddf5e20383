use std::{sync::Arc, time::Instant};

use log::{debug, info};

use crate::{
    config::IndexerSettings,
    db::{models::IndexerCheckpoint, CheckpointStore, InvoiceStore},
    error::IndexerError,
    webhook::WebhookDispatcher,
    worker::{
        events::{ChainEvent, EventKind},
        fetcher::RangeFetcher,
        ledger::LedgerClient,
        reconciler::Reconciler,
    },
};

/// Result of one successful indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The checkpoint already covered the chain head.
    UpToDate { block: u64 },
    /// Every event in `(from, to]` was reconciled and fanned out.
    Advanced {
        from: u64,
        to: u64,
        events: usize,
        notifications: usize,
    },
}

/// Invoice contract indexer.
///
/// Each pass reads the checkpoint and the chain head, fetches the four
/// event kinds over the new range in a fixed order, applies status changes,
/// queues webhook notifications, and only then moves the checkpoint.
/// Any error aborts the pass with the checkpoint untouched, so the next
/// pass re-reads the same range.
pub struct IndexerWorker {
    checkpoint_key: String,
    start_block: Option<u64>,
    ledger: Arc<dyn LedgerClient>,
    checkpoints: Arc<dyn CheckpointStore>,
    fetcher: RangeFetcher,
    reconciler: Reconciler,
    dispatcher: WebhookDispatcher,
}

impl IndexerWorker {
    pub fn new<S>(
        settings: &IndexerSettings,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<S>,
        dispatcher: WebhookDispatcher,
    ) -> Self
    where
        S: CheckpointStore + InvoiceStore + 'static,
    {
        Self {
            checkpoint_key: settings.checkpoint_key.clone(),
            start_block: settings.start_block,
            fetcher: RangeFetcher::new(ledger.clone(), settings),
            ledger,
            checkpoints: store.clone(),
            reconciler: Reconciler::new(store),
            dispatcher,
        }
    }

    pub fn checkpoint_key(&self) -> &str {
        &self.checkpoint_key
    }

    /// Last fully processed block, creating the checkpoint on first run.
    async fn last_block(&self) -> Result<u64, IndexerError> {
        let existing = self
            .checkpoints
            .get_checkpoint(&self.checkpoint_key)
            .await
            .map_err(|e| self.checkpoint_error(e))?;

        if let Some(checkpoint) = existing {
            return Ok(checkpoint.last_block);
        }

        let seed = match self.start_block {
            Some(block) => block,
            None => self.ledger.current_height().await?,
        };

        let stored = self
            .checkpoints
            .init_checkpoint(&IndexerCheckpoint::new(&self.checkpoint_key, seed))
            .await
            .map_err(|e| self.checkpoint_error(e))?;

        info!(
            "Initialized checkpoint '{}' at block {}",
            self.checkpoint_key, stored
        );
        Ok(stored)
    }

    /// Run one indexing pass.
    pub async fn run_pass(&self) -> Result<PassOutcome, IndexerError> {
        let from = self.last_block().await?;
        let to = self.ledger.current_height().await?;

        if from >= to {
            debug!("Up to date at block {} (head {})", from, to);
            return Ok(PassOutcome::UpToDate { block: from });
        }

        let started = Instant::now();

        // Phase 1 -> Fetch every kind over (from, to], one kind at a time
        let mut events: Vec<ChainEvent> = Vec::new();
        for kind in EventKind::ALL {
            let mut batch = self.fetcher.fetch_range(kind, from + 1, to).await?;
            events.append(&mut batch);
        }

        // Phase 2 -> Apply status changes; a failed write aborts the pass
        for event in &events {
            self.reconciler.apply(event).await?;
        }

        // Phase 3 -> Queue notifications in fetch order
        let mut notifications = 0;
        for event in &events {
            notifications += self.dispatcher.notify(event).await?;
        }

        // Phase 4 -> Advance the checkpoint only after everything above succeeded
        self.checkpoints
            .set_checkpoint(&IndexerCheckpoint::new(&self.checkpoint_key, to))
            .await
            .map_err(|e| self.checkpoint_error(e))?;

        info!(
            "Indexed blocks {}-{}: {} events, {} notifications queued ({:?})",
            from + 1,
            to,
            events.len(),
            notifications,
            started.elapsed()
        );

        Ok(PassOutcome::Advanced {
            from,
            to,
            events: events.len(),
            notifications,
        })
    }

    fn checkpoint_error(&self, err: anyhow::Error) -> IndexerError {
        IndexerError::Checkpoint {
            key: self.checkpoint_key.clone(),
            reason: format!("{:#}", err),
        }
    }
}
