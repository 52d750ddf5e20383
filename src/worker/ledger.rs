use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::Filter,
    transports::{RpcError, TransportError, TransportErrorKind},
};
use anyhow::Context;
use async_trait::async_trait;
use log::warn;
use url::Url;

use crate::{
    error::{IndexerError, LedgerError},
    worker::events::{ChainEvent, EventKind},
};

/// Read access to the remote ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current chain head.
    async fn current_height(&self) -> Result<u64, LedgerError>;

    /// Decoded events of `kind` in `[from, to]` (inclusive), in chain order.
    ///
    /// Transport failures come back as [`IndexerError::Ledger`] so callers can
    /// tell a rate-limit signal apart from a decode failure.
    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, IndexerError>;
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        if let Some(payload) = err.as_error_resp() {
            return LedgerError::with_code(payload.code, payload.message.to_string());
        }

        let http_status = match &err {
            RpcError::Transport(TransportErrorKind::HttpError(http)) => Some(http.status),
            _ => None,
        };

        LedgerError {
            code: None,
            message: err.to_string(),
            http_status,
        }
    }
}

/// JSON-RPC ledger client for the InvoicePayments contract.
#[derive(Clone)]
pub struct AlloyLedger {
    provider: DynProvider,
    contract: Address,
}

impl AlloyLedger {
    pub fn new(rpc_url: &str, contract: Address) -> anyhow::Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider: DynProvider::new(client),
            contract,
        })
    }
}

#[async_trait]
impl LedgerClient for AlloyLedger {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, IndexerError> {
        let filter = Filter::new()
            .address(self.contract)
            .event_signature(kind.signature_hash())
            .from_block(from)
            .to_block(to);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(LedgerError::from)?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if log.removed {
                warn!(
                    "Ignoring removed {} log in block {:?} (reorg)",
                    kind, log.block_number
                );
                continue;
            }
            events.push(ChainEvent::decode(kind, log)?);
        }

        Ok(events)
    }
}
