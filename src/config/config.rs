use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{bail, Context};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

/// PostgreSQL database connection configuration.
///
/// Used for storing:
/// - Indexer checkpoints
/// - Invoices reconciled from chain events
/// - Webhook subscriptions
///
/// When `url` is set it takes precedence over the discrete fields.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_pg_database() -> String {
    "invoices".to_string()
}

fn default_pool_size() -> usize {
    16
}

/// JSON-RPC endpoint and contract the indexer reads from.
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub invoice_payments_address: String,
}

fn default_rpc_url() -> String {
    "https://node.shadownet.etherlink.com".to_string()
}

fn default_chain_id() -> u64 {
    127_823
}

/// Polling, paging and rate-limit tuning for the indexer loop.
///
/// The defaults are sized for a public RPC that caps `eth_getLogs` at 200
/// blocks and answers bursts with "retry in 10s".
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    #[serde(default = "default_checkpoint_key")]
    pub checkpoint_key: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_rate_limit_retry_delay")]
    pub rate_limit_retry_delay_ms: u64,
    #[serde(default = "default_rate_limit_max_retries")]
    pub rate_limit_max_retries: u32,
    /// Seeds the checkpoint on first run instead of the chain head.
    #[serde(default)]
    pub start_block: Option<u64>,
}

fn default_checkpoint_key() -> String {
    "invoice_payments_last_block".to_string()
}

fn default_poll_interval() -> u64 {
    15_000
}

fn default_max_block_range() -> u64 {
    200
}

fn default_request_delay() -> u64 {
    800
}

fn default_rate_limit_retry_delay() -> u64 {
    12_000
}

fn default_rate_limit_max_retries() -> u32 {
    3
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            checkpoint_key: default_checkpoint_key(),
            poll_interval_ms: default_poll_interval(),
            max_block_range: default_max_block_range(),
            request_delay_ms: default_request_delay(),
            rate_limit_retry_delay_ms: default_rate_limit_retry_delay(),
            rate_limit_max_retries: default_rate_limit_max_retries(),
            start_block: None,
        }
    }
}

impl IndexerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_retry_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_retry_delay_ms)
    }
}

/// Outbound webhook delivery configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookSettings {
    #[serde(default = "default_webhook_timeout")]
    pub timeout_ms: u64,
    /// Upper bound on concurrently running deliveries.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_webhook_timeout() -> u64 {
    10_000
}

fn default_max_in_flight() -> usize {
    64
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_webhook_timeout(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` (optional) and then from `INDEXER_*`
/// environment variables, e.g. `INDEXER_LEDGER__RPC_URL`.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub webhooks: WebhookSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("INDEXER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }

    /// Rejects values that would make the indexer loop misbehave at runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.indexer.max_block_range == 0 {
            bail!("indexer.max_block_range must be at least 1");
        }
        if self.indexer.poll_interval_ms == 0 {
            bail!("indexer.poll_interval_ms must be at least 1");
        }
        if self.webhooks.max_in_flight == 0 {
            bail!("webhooks.max_in_flight must be at least 1");
        }
        self.contract_address()?;
        Url::parse(&self.ledger.rpc_url)
            .with_context(|| format!("Invalid ledger.rpc_url: {}", self.ledger.rpc_url))?;
        Ok(())
    }

    pub fn contract_address(&self) -> anyhow::Result<Address> {
        self.ledger
            .invoice_payments_address
            .parse::<Address>()
            .with_context(|| {
                format!(
                    "Invalid ledger.invoice_payments_address: {}",
                    self.ledger.invoice_payments_address
                )
            })
    }
}
