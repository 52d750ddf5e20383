//! Fixed-interval scheduler for indexing passes.
//!
//! One pass runs immediately at start-up and then on every interval tick.
//! A tick that fires while a pass is still running is skipped, so passes
//! never overlap. Pass failures are logged and the next tick retries.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::{
    error::IndexerError,
    worker::{IndexerWorker, PassOutcome},
};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    Completed(PassOutcome),
    Failed(IndexerError),
    /// A previous pass was still running.
    Skipped,
}

/// Drives [`IndexerWorker::run_pass`] on a fixed interval.
#[derive(Clone)]
pub struct PollScheduler {
    worker: Arc<IndexerWorker>,
    interval: Duration,
    running: Arc<Mutex<()>>,
}

impl PollScheduler {
    pub fn new(worker: Arc<IndexerWorker>, interval: Duration) -> Self {
        Self {
            worker,
            interval,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one pass unless another one is in progress.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Previous indexing pass still running, skipping tick");
            return TickOutcome::Skipped;
        };

        match self.worker.run_pass().await {
            Ok(outcome) => TickOutcome::Completed(outcome),
            Err(e) => {
                if e.is_rate_limited() {
                    warn!("Indexing pass rate limited: {:#}", e);
                } else {
                    error!("Indexing pass failed: {:#}", e);
                }
                TickOutcome::Failed(e)
            },
        }
    }

    /// Runs the scheduler until cancellation.
    ///
    /// On cancellation no new pass starts; a pass already running is awaited.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        let this = self.clone();
        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let this = this.clone();
            Box::pin(async move {
                this.tick().await;
            })
        })?;
        scheduler.add(job).await?;

        scheduler.start().await?;
        info!(
            "Poll scheduler started for '{}' (every {:?})",
            self.worker.checkpoint_key(),
            self.interval
        );

        // Don't wait a full interval for the first pass
        if !cancellation_token.is_cancelled() {
            self.tick().await;
        }

        cancellation_token.cancelled().await;
        info!("Poll scheduler shutting down...");

        scheduler.shutdown().await?;

        let _guard = self.running.lock().await;
        info!("Poll scheduler stopped");
        Ok(())
    }

    /// Spawn [`run`](Self::run) as a background task.
    pub fn start(&self, cancellation_token: CancellationToken) -> SchedulerHandle {
        let this = self.clone();
        let token = cancellation_token.clone();
        let handle = tokio::spawn(async move { this.run(token).await });

        SchedulerHandle {
            token: cancellation_token,
            handle,
        }
    }
}

/// Owned handle to a running [`PollScheduler`].
pub struct SchedulerHandle {
    token: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the scheduler and wait for it to wind down.
    pub async fn stop(self) -> Result<()> {
        self.token.cancel();
        self.handle.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::LedgerError;
    use crate::test_support::{quiet_settings, RecordingTransport, ScriptedLedger};
    use crate::webhook::WebhookDispatcher;
    use crate::worker::EventKind;

    fn scheduler(ledger: Arc<ScriptedLedger>, store: Arc<MemoryStore>) -> PollScheduler {
        let mut settings = quiet_settings();
        settings.start_block = Some(0);
        let dispatcher =
            WebhookDispatcher::new(store.clone(), Arc::new(RecordingTransport::new()), 4);
        let worker = IndexerWorker::new(&settings, ledger, store, dispatcher);
        PollScheduler::new(Arc::new(worker), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn tick_is_skipped_while_a_pass_runs() {
        let scheduler = scheduler(
            Arc::new(ScriptedLedger::new(10)),
            Arc::new(MemoryStore::new()),
        );

        let guard = scheduler.running.try_lock().unwrap();
        assert!(matches!(scheduler.tick().await, TickOutcome::Skipped));
        drop(guard);

        assert!(matches!(
            scheduler.tick().await,
            TickOutcome::Completed(PassOutcome::Advanced { to: 10, .. })
        ));
    }

    #[tokio::test]
    async fn failed_pass_is_reported_and_retried() {
        let ledger = Arc::new(ScriptedLedger::new(10));
        let store = Arc::new(MemoryStore::new());
        ledger.fail(EventKind::Paid, 1, 1, LedgerError::new("connection reset"));
        let scheduler = scheduler(ledger, store.clone());

        assert!(matches!(scheduler.tick().await, TickOutcome::Failed(_)));
        assert_eq!(store.last_block("test_last_block"), Some(0));

        assert!(matches!(
            scheduler.tick().await,
            TickOutcome::Completed(PassOutcome::Advanced { from: 0, to: 10, .. })
        ));
        assert_eq!(store.last_block("test_last_block"), Some(10));
    }

    #[tokio::test]
    async fn exhausted_rate_limit_is_reported_as_rate_limited() {
        let ledger = Arc::new(ScriptedLedger::new(10));
        let store = Arc::new(MemoryStore::new());
        ledger.fail(
            EventKind::Created,
            1,
            u32::MAX,
            LedgerError::with_code(-32090, "retry in 10s"),
        );
        let scheduler = scheduler(ledger, store.clone());

        match scheduler.tick().await {
            TickOutcome::Failed(err) => {
                assert!(err.is_rate_limited());
                assert!(matches!(err, IndexerError::FetchFailed { .. }));
            },
            other => panic!("unexpected tick outcome: {:?}", other),
        }
        assert_eq!(store.last_block("test_last_block"), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_runs_a_pass_immediately_and_stops() {
        let ledger = Arc::new(ScriptedLedger::new(42));
        let store = Arc::new(MemoryStore::new());
        let handle = scheduler(ledger, store.clone()).start(CancellationToken::new());

        for _ in 0..200 {
            if store.last_block("test_last_block") == Some(42) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.last_block("test_last_block"), Some(42));
        assert!(!handle.is_finished());

        handle.stop().await.unwrap();
    }
}
