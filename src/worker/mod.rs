pub mod events;
pub mod fetcher;
pub mod ledger;
pub mod reconciler;
pub mod worker;

pub use events::{ChainEvent, EventKind, EventPayload};
pub use fetcher::{block_ranges, RangeFetcher};
pub use ledger::{AlloyLedger, LedgerClient};
pub use reconciler::{Reconciler, Reconciliation};
pub use worker::{IndexerWorker, PassOutcome};
