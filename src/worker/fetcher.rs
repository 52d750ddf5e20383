//! Range-bounded log fetching against a rate-limited RPC.
//!
//! `eth_getLogs` is capped at a maximum block span, so a range is split into
//! consecutive chunks that are queried one at a time with a short pause
//! between them. A rate-limit response pauses for a longer cooldown and
//! retries the same chunk; any other failure abandons the whole range.

use std::{sync::Arc, time::Duration};

use log::{debug, error, warn};

use crate::{
    config::IndexerSettings,
    error::IndexerError,
    worker::{
        events::{ChainEvent, EventKind},
        ledger::LedgerClient,
    },
};

/// Split `[from, to]` into consecutive inclusive chunks of at most `span` blocks.
pub fn block_ranges(from: u64, to: u64, span: u64) -> Vec<(u64, u64)> {
    let span = span.max(1);
    let mut ranges = Vec::new();
    if from > to {
        return ranges;
    }

    let mut start = from;
    loop {
        let end = start.saturating_add(span - 1).min(to);
        ranges.push((start, end));
        if end == to {
            break;
        }
        start = end + 1;
    }

    ranges
}

/// Fetches one event kind over a block range, chunk by chunk.
pub struct RangeFetcher {
    ledger: Arc<dyn LedgerClient>,
    max_block_range: u64,
    request_delay: Duration,
    rate_limit_delay: Duration,
    max_retries: u32,
}

impl RangeFetcher {
    pub fn new(ledger: Arc<dyn LedgerClient>, settings: &IndexerSettings) -> Self {
        Self {
            ledger,
            max_block_range: settings.max_block_range,
            request_delay: settings.request_delay(),
            rate_limit_delay: settings.rate_limit_retry_delay(),
            max_retries: settings.rate_limit_max_retries,
        }
    }

    /// Fetch every `kind` event in `[from, to]` in ascending block order.
    ///
    /// On error nothing is returned, including chunks that already succeeded.
    pub async fn fetch_range(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, IndexerError> {
        let ranges = block_ranges(from, to, self.max_block_range);
        let last = ranges.len().saturating_sub(1);
        let mut all_events = Vec::new();

        for (i, (start, end)) in ranges.into_iter().enumerate() {
            let mut events = self.fetch_chunk(kind, start, end).await?;
            events.sort_by_key(|e| (e.block_number, e.log_index));
            debug!(
                "Fetched {} {} events in [{}-{}]",
                events.len(),
                kind,
                start,
                end
            );
            all_events.append(&mut events);

            // Throttle between requests to stay under the provider's limit
            if i < last && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        Ok(all_events)
    }

    async fn fetch_chunk(
        &self,
        kind: EventKind,
        start: u64,
        end: u64,
    ) -> Result<Vec<ChainEvent>, IndexerError> {
        let mut retries = 0;

        loop {
            let err = match self.ledger.query_logs(kind, start, end).await {
                Ok(events) => return Ok(events),
                Err(IndexerError::Ledger(err)) => err,
                Err(other) => return Err(other),
            };

            if !err.is_rate_limited() {
                error!(
                    "Error querying {} from block {} to {} ({} blocks): {}",
                    kind,
                    start,
                    end,
                    end - start + 1,
                    err
                );
                return Err(IndexerError::FetchFailed {
                    kind,
                    from: start,
                    to: end,
                    source: Box::new(IndexerError::Ledger(err)),
                });
            }

            if retries >= self.max_retries {
                error!(
                    "Giving up on {} [{}-{}] after {} rate-limit retries",
                    kind, start, end, retries
                );
                return Err(IndexerError::FetchFailed {
                    kind,
                    from: start,
                    to: end,
                    source: Box::new(IndexerError::RateLimited {
                        kind,
                        from: start,
                        to: end,
                        retries,
                        source: err,
                    }),
                });
            }

            retries += 1;
            warn!(
                "Rate limited on {} [{}-{}], waiting {:?} (retry {}/{})",
                kind, start, end, self.rate_limit_delay, retries, self.max_retries
            );
            tokio::time::sleep(self.rate_limit_delay).await;
        }
    }
}
