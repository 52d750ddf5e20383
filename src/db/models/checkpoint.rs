use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indexer progress checkpoint (PostgreSQL).
///
/// Stores the last block whose events were fully fetched, reconciled and
/// fanned out, keyed by indexer name. Used to resume after restarts without
/// skipping blocks; the stored value never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerCheckpoint {
    pub key: String,
    pub last_block: u64,
    pub updated_at: DateTime<Utc>,
}

impl IndexerCheckpoint {
    pub fn new(key: impl Into<String>, last_block: u64) -> Self {
        Self {
            key: key.into(),
            last_block,
            updated_at: Utc::now(),
        }
    }
}
