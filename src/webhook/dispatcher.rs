use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::{
    config::WebhookSettings,
    db::SubscriptionStore,
    error::IndexerError,
    webhook::payload::WebhookBody,
    worker::ChainEvent,
};

/// Outbound notification transport.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, url: &str, body: &Value) -> anyhow::Result<()>;
}

/// HTTP transport: one JSON POST, non-2xx counts as a failure.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &WebhookSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("Failed to build webhook HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, url: &str, body: &Value) -> anyhow::Result<()> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("subscriber rejected the notification")?;
        Ok(())
    }
}

/// Fans each event out to the webhooks subscribed to its label.
///
/// Deliveries run as detached tasks bounded by a semaphore. There is no
/// ordering guarantee relative to the pass that queued them, and no
/// guarantee they complete before shutdown.
#[derive(Clone)]
pub struct WebhookDispatcher {
    subscriptions: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn WebhookTransport>,
    in_flight: Arc<Semaphore>,
}

impl WebhookDispatcher {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn WebhookTransport>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            subscriptions,
            transport,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Queue one delivery per interested subscriber and return how many were queued.
    ///
    /// Only the subscription lookup can fail; delivery outcomes are logged.
    pub async fn notify(&self, event: &ChainEvent) -> Result<usize, IndexerError> {
        let label = event.kind().label();

        let webhooks = self
            .subscriptions
            .webhooks_for_event(label)
            .await
            .map_err(|e| IndexerError::SubscriptionLookup {
                event: label.to_string(),
                reason: format!("{:#}", e),
            })?;

        if webhooks.is_empty() {
            return Ok(0);
        }

        let body = match serde_json::to_value(WebhookBody::from(event)) {
            Ok(body) => Arc::new(body),
            Err(e) => {
                warn!("Failed to serialize {} webhook body: {}", label, e);
                return Ok(0);
            },
        };

        let queued = webhooks.len();
        for webhook in webhooks {
            let transport = self.transport.clone();
            let in_flight = self.in_flight.clone();
            let body = body.clone();

            tokio::spawn(async move {
                let Ok(_permit) = in_flight.acquire_owned().await else {
                    return;
                };
                match transport.post(&webhook.url, &body).await {
                    Ok(()) => debug!("Delivered {} to {}", label, webhook.url),
                    Err(e) => warn!("Webhook dispatch failed: {} ({}): {:#}", webhook.url, label, e),
                }
            });
        }

        Ok(queued)
    }
}
