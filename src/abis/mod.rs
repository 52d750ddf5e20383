pub mod invoice_payments;

pub use invoice_payments::{InvoiceCancelled, InvoiceCreated, InvoicePaid, Withdrawal};
