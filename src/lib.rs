pub mod abis;
pub mod config;
pub mod cron;
pub mod db;
pub mod error;
pub mod utils;
pub mod webhook;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::Settings;
pub use cron::{PollScheduler, SchedulerHandle, TickOutcome};
pub use db::{Database, MemoryStore, PostgresClient};
pub use error::{IndexerError, LedgerError};
pub use webhook::{HttpTransport, WebhookBody, WebhookDispatcher, WebhookTransport};
pub use worker::{AlloyLedger, ChainEvent, EventKind, EventPayload, IndexerWorker, LedgerClient, PassOutcome};
