pub mod change_request;
pub mod escalation;
pub mod guards;
pub mod numbering;
pub mod service;
pub mod types;

pub use service::WorkflowService;
pub use types::*;
