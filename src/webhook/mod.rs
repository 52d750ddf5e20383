//! Webhook fan-out for indexed chain events.
//!
//! Deliveries are fire-and-forget: one attempt per subscriber, failures are
//! logged and never reach the indexer pass.

mod dispatcher;
mod payload;

pub use dispatcher::{HttpTransport, WebhookDispatcher, WebhookTransport};
pub use payload::WebhookBody;
