use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use invoice_indexer::{
    AlloyLedger, Database, HttpTransport, IndexerWorker, PollScheduler, Settings,
    WebhookDispatcher,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );
    settings.validate()?;

    let db = Database::new(settings.clone())
        .await
        .context("Failed to initialize database connection")?;

    let ledger = Arc::new(
        AlloyLedger::new(&settings.ledger.rpc_url, settings.contract_address()?)
            .context("Failed to create ledger client")?,
    );
    info!(
        "Watching InvoicePayments {} on chain {} via {}",
        settings.ledger.invoice_payments_address,
        settings.ledger.chain_id,
        settings.ledger.rpc_url
    );

    let transport = Arc::new(HttpTransport::new(&settings.webhooks)?);
    let dispatcher = WebhookDispatcher::new(
        db.postgres.clone(),
        transport,
        settings.webhooks.max_in_flight,
    );

    let worker = IndexerWorker::new(&settings.indexer, ledger, db.postgres.clone(), dispatcher);
    let scheduler = PollScheduler::new(Arc::new(worker), settings.indexer.poll_interval());

    let cancellation_token = CancellationToken::new();
    let handle = scheduler.start(cancellation_token.child_token());

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Indexer running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    // Let the current pass finish; queued webhook deliveries are not drained
    info!("Waiting for the poll scheduler to stop...");
    cancellation_token.cancel();
    handle.stop().await?;

    info!("Indexer stopped");
    Ok(())
}
