pub mod allocation;
pub mod service;
pub mod types;

pub use service::{InvoiceApproval, PaymentRecording, RevenueLedger};
pub use types::*;
