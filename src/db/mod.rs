use std::sync::Arc;

use crate::config::Settings;

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::{CheckpointStore, InvoiceStore, SubscriptionStore};

/// Database handle shared by the indexer and the webhook dispatcher.
///
/// PostgreSQL holds invoices, webhook subscriptions and the checkpoint.
#[derive(Clone)]
pub struct Database {
    pub postgres: Arc<PostgresClient>,
}

impl Database {
    pub async fn new(settings: Arc<Settings>) -> anyhow::Result<Self> {
        let postgres = PostgresClient::new(settings.postgres.clone()).await?;

        postgres.health_check().await?;
        postgres.migrate().await?;

        Ok(Self {
            postgres: Arc::new(postgres),
        })
    }
}
