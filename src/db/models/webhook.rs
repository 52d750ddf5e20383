use serde::{Deserialize, Serialize};

/// Webhook subscription (PostgreSQL, read-only to the indexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: i64,
    pub organization_id: String,
    pub url: String,
    pub subscribed_events: Vec<String>,
}

impl WebhookSubscription {
    pub fn is_subscribed_to(&self, event: &str) -> bool {
        self.subscribed_events.iter().any(|e| e == event)
    }
}
