mod config;

pub use config::{IndexerSettings, LedgerSettings, PostgresSettings, Settings, WebhookSettings};
