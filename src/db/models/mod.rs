mod checkpoint;
mod invoice;
mod webhook;

pub use checkpoint::IndexerCheckpoint;
pub use invoice::{Invoice, InvoiceStatus, NewInvoice, UNDEPLOYED_ONCHAIN_ID};
pub use webhook::WebhookSubscription;
