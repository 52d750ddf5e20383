//! Scripted fakes for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::IndexerSettings;
use crate::error::{IndexerError, LedgerError};
use crate::webhook::WebhookTransport;
use crate::worker::{ChainEvent, EventKind, EventPayload, LedgerClient};

pub const PAYER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const TOKEN: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Indexer settings with every delay set to zero.
pub fn quiet_settings() -> IndexerSettings {
    IndexerSettings {
        checkpoint_key: "test_last_block".to_string(),
        poll_interval_ms: 60_000,
        max_block_range: 200,
        request_delay_ms: 0,
        rate_limit_retry_delay_ms: 0,
        rate_limit_max_retries: 3,
        start_block: None,
    }
}

fn event(block_number: u64, payload: EventPayload) -> ChainEvent {
    ChainEvent {
        block_number,
        log_index: 0,
        tx_hash: format!("0x{:064x}", block_number),
        payload,
    }
}

pub fn created(block_number: u64, invoice_id: i64) -> ChainEvent {
    event(
        block_number,
        EventPayload::Created {
            invoice_id,
            creator: PAYER.to_string(),
            token: TOKEN.to_string(),
            amount: U256::from(1_000u64),
        },
    )
}

pub fn paid(block_number: u64, invoice_id: i64) -> ChainEvent {
    event(
        block_number,
        EventPayload::Paid {
            invoice_id,
            payer: PAYER.to_string(),
            amount: U256::from(1_000u64),
        },
    )
}

pub fn cancelled(block_number: u64, invoice_id: i64) -> ChainEvent {
    event(block_number, EventPayload::Cancelled { invoice_id })
}

pub fn withdrawal(block_number: u64) -> ChainEvent {
    event(
        block_number,
        EventPayload::WithdrawalCompleted {
            user: PAYER.to_string(),
            token: TOKEN.to_string(),
            amount: U256::from(250u64),
        },
    )
}

/// Ledger that serves a fixed event list and scripted failures.
pub struct ScriptedLedger {
    head: AtomicU64,
    events: Mutex<Vec<ChainEvent>>,
    /// `(kind, chunk start) -> (remaining failures, error)`
    failures: Mutex<HashMap<(EventKind, u64), (u32, LedgerError)>>,
    calls: Mutex<Vec<(EventKind, u64, u64)>>,
}

impl ScriptedLedger {
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            events: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn push(&self, event: ChainEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Fail the next `times` queries for `kind` whose range starts at `start`.
    pub fn fail(&self, kind: EventKind, start: u64, times: u32, err: LedgerError) {
        self.failures
            .lock()
            .unwrap()
            .insert((kind, start), (times, err));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(EventKind, u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, IndexerError> {
        self.calls.lock().unwrap().push((kind, from, to));

        if let Some((remaining, err)) = self.failures.lock().unwrap().get_mut(&(kind, from)) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(IndexerError::Ledger(err.clone()));
            }
        }

        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind && e.block_number >= from && e.block_number <= to)
            .cloned()
            .collect())
    }
}

/// Transport that records every delivery; URLs containing "fail" error out.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<(String, Value)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<(String, Value)> {
        self.delivered.lock().unwrap().clone()
    }

    /// Wait until at least `count` deliveries were attempted.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, Value)> {
        for _ in 0..200 {
            if self.delivered.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.delivered()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post(&self, url: &str, body: &Value) -> anyhow::Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        if url.contains("fail") {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}
