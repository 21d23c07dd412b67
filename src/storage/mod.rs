//! Transactional persistence seam.
//!
//! Services never touch a connection directly: every operation runs inside
//! [`Store::transaction`] and talks to a [`StoreTx`]. A closure returning
//! `Err` rolls the whole unit of work back. `lock_*` methods take a row lock
//! that is held until the transaction ends. Locks are always taken
//! assignment first, then the approval request or invoice request.

pub mod memory;
pub mod models;
pub mod pg;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::authz::types::{HierarchyEntry, Officer, RoleAssignment};
use crate::core::shared::enums::RevenueType;
use crate::error::WorkflowError;
use crate::ledger::types::{InvoiceRequest, LedgerEntry, PaymentReceipt};
use crate::workflow::types::{
    ActivityRecord, ApprovalRequest, Assignment, ExpenditureItem, Milestone, RevenueShare,
    TeamMember,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type TxResult<T> = Result<T, WorkflowError>;

pub trait StoreTx {
    // Directory
    fn officer(&mut self, officer_id: &str) -> TxResult<Option<Officer>>;
    fn role_assignments(&mut self, officer_id: &str) -> TxResult<Vec<RoleAssignment>>;
    fn assignments_led_by(&mut self, officer_id: &str) -> TxResult<Vec<Uuid>>;
    fn hierarchy_entries(&mut self) -> TxResult<Vec<HierarchyEntry>>;

    /// Increments and returns the counter stored under `key`, starting at 1.
    fn next_sequence(&mut self, key: &str) -> TxResult<i64>;

    // Assignments
    fn insert_assignment(&mut self, assignment: &Assignment) -> TxResult<()>;
    fn find_assignment(&mut self, id: Uuid) -> TxResult<Option<Assignment>>;
    fn lock_assignment(&mut self, id: Uuid) -> TxResult<Assignment>;
    fn update_assignment(&mut self, assignment: &Assignment) -> TxResult<()>;

    // Section data
    fn expenditure_items(&mut self, assignment_id: Uuid) -> TxResult<Vec<ExpenditureItem>>;
    fn replace_expenditure_items(
        &mut self,
        assignment_id: Uuid,
        items: &[ExpenditureItem],
    ) -> TxResult<()>;
    fn team_members(&mut self, assignment_id: Uuid) -> TxResult<Vec<TeamMember>>;
    fn replace_team_members(&mut self, assignment_id: Uuid, members: &[TeamMember])
        -> TxResult<()>;
    fn milestones(&mut self, assignment_id: Uuid) -> TxResult<Vec<Milestone>>;
    fn replace_milestones(&mut self, assignment_id: Uuid, milestones: &[Milestone])
        -> TxResult<()>;
    fn update_milestone(&mut self, milestone: &Milestone) -> TxResult<()>;
    fn revenue_shares(&mut self, assignment_id: Uuid) -> TxResult<Vec<RevenueShare>>;
    fn replace_revenue_shares(&mut self, assignment_id: Uuid, shares: &[RevenueShare])
        -> TxResult<()>;

    // Approval requests
    fn insert_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()>;
    fn find_approval_request(&mut self, id: Uuid) -> TxResult<Option<ApprovalRequest>>;
    fn lock_approval_request(&mut self, id: Uuid) -> TxResult<ApprovalRequest>;
    fn update_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()>;
    fn approval_requests_for(&mut self, reference_id: Uuid) -> TxResult<Vec<ApprovalRequest>>;

    // Invoicing
    fn insert_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()>;
    fn lock_invoice_request(&mut self, id: Uuid) -> TxResult<InvoiceRequest>;
    fn update_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()>;
    fn invoice_requests_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<InvoiceRequest>>;
    fn insert_payment_receipt(&mut self, receipt: &PaymentReceipt) -> TxResult<()>;
    fn receipt_for_invoice(&mut self, invoice_id: Uuid) -> TxResult<Option<PaymentReceipt>>;
    fn receipts_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<PaymentReceipt>>;

    // Ledger (append-only)
    fn append_ledger_entries(&mut self, entries: &[LedgerEntry]) -> TxResult<()>;
    fn ledger_entries_for_source(
        &mut self,
        source_id: Uuid,
        revenue_type: RevenueType,
    ) -> TxResult<Vec<LedgerEntry>>;
    fn ledger_entries_for_officer(
        &mut self,
        officer_id: &str,
        fy_period: &str,
    ) -> TxResult<Vec<LedgerEntry>>;

    fn log_activity(&mut self, record: &ActivityRecord) -> TxResult<()>;
}

pub trait Store: Send + Sync {
    /// Runs `work` once inside a transaction. Implementations commit only if
    /// it returns `Ok`.
    fn run(
        &self,
        work: &mut dyn FnMut(&mut dyn StoreTx) -> TxResult<()>,
    ) -> TxResult<()>;
}

impl dyn Store {
    pub fn transaction<T, F>(&self, f: F) -> TxResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> TxResult<T>,
    {
        let mut f = Some(f);
        let mut out = None;
        self.run(&mut |tx| {
            let f = f
                .take()
                .ok_or_else(|| WorkflowError::Internal("transaction body re-entered".into()))?;
            out = Some(f(tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| WorkflowError::Internal("transaction produced no result".into()))
    }
}

/// Day used for effective-dating role and hierarchy rows.
pub fn effective_today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
