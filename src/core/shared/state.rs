use std::sync::Arc;

use crate::authz::AuthorizationEngine;
use crate::core::config::AppConfig;
use crate::ledger::RevenueLedger;
use crate::storage::Store;
use crate::workflow::WorkflowService;

/// Shared handles for the HTTP layer. Services are cheap to clone and all
/// point at the same store.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub authz: Arc<AuthorizationEngine>,
    pub workflow: WorkflowService,
    pub ledger: RevenueLedger,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, authz: AuthorizationEngine) -> Self {
        let authz = Arc::new(authz);
        let workflow = WorkflowService::new(store.clone(), authz.clone(), config.workflow.clone());
        let ledger = RevenueLedger::new(store.clone(), authz.clone(), config.workflow.clone());
        Self {
            config,
            store,
            authz,
            workflow,
            ledger,
        }
    }
}
