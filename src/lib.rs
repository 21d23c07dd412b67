pub mod api;
pub mod authz;
pub mod core;
pub mod error;
pub mod ledger;
pub mod progress;
pub mod storage;
pub mod workflow;

pub use error::WorkflowError;
