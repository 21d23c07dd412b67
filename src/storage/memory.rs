use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::authz::types::{HierarchyEntry, Officer, RoleAssignment};
use crate::core::shared::enums::{RevenueType, WorkflowStage};
use crate::error::WorkflowError;
use crate::ledger::types::{InvoiceRequest, LedgerEntry, PaymentReceipt};
use crate::workflow::types::{
    ActivityRecord, ApprovalRequest, Assignment, ExpenditureItem, Milestone, RevenueShare,
    TeamMember,
};

use super::{Store, StoreTx, TxResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    officers: HashMap<String, Officer>,
    roles: Vec<RoleAssignment>,
    hierarchy: Vec<HierarchyEntry>,
    sequences: HashMap<String, i64>,
    assignments: HashMap<Uuid, Assignment>,
    assignment_order: Vec<Uuid>,
    expenditure: HashMap<Uuid, Vec<ExpenditureItem>>,
    team: HashMap<Uuid, Vec<TeamMember>>,
    milestones: HashMap<Uuid, Vec<Milestone>>,
    shares: HashMap<Uuid, Vec<RevenueShare>>,
    requests: Vec<ApprovalRequest>,
    invoices: Vec<InvoiceRequest>,
    receipts: Vec<PaymentReceipt>,
    ledger: Vec<LedgerEntry>,
    activity: Vec<ActivityRecord>,
}

/// In-process store for embedding and tests.
///
/// Transactions are serialized behind one mutex and run against a copy of
/// the state that replaces the original only when the work succeeds, so a
/// failed operation leaves nothing behind. The unique rules the database
/// enforces (one receipt per invoice, one ledger row per source, type and
/// officer, unique assignment numbers) are enforced here too.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn add_officer(&self, officer: Officer) {
        self.with_state(|s| {
            s.officers.insert(officer.officer_id.clone(), officer);
        });
    }

    pub fn grant_role(&self, role: RoleAssignment) {
        self.with_state(|s| s.roles.push(role));
    }

    pub fn add_hierarchy_entry(&self, entry: HierarchyEntry) {
        self.with_state(|s| s.hierarchy.push(entry));
    }

    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.with_state(|s| s.ledger.clone())
    }

    pub fn activity(&self) -> Vec<ActivityRecord> {
        self.with_state(|s| s.activity.clone())
    }
}

impl Store for MemoryStore {
    fn run(
        &self,
        work: &mut dyn FnMut(&mut dyn StoreTx) -> TxResult<()>,
    ) -> TxResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| WorkflowError::Internal("memory store lock poisoned".into()))?;
        let mut working = (*guard).clone();
        work(&mut MemoryTx {
            state: &mut working,
        })?;
        *guard = working;
        Ok(())
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

fn not_found(what: &str, id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("{} {} not found", what, id))
}

fn duplicate(what: &str) -> WorkflowError {
    WorkflowError::InvalidState(format!("duplicate record: {}", what))
}

impl StoreTx for MemoryTx<'_> {
    fn officer(&mut self, officer_id: &str) -> TxResult<Option<Officer>> {
        Ok(self.state.officers.get(officer_id).cloned())
    }

    fn role_assignments(&mut self, officer_id: &str) -> TxResult<Vec<RoleAssignment>> {
        Ok(self
            .state
            .roles
            .iter()
            .filter(|r| r.officer_id == officer_id)
            .cloned()
            .collect())
    }

    fn assignments_led_by(&mut self, officer_id: &str) -> TxResult<Vec<Uuid>> {
        let state = &*self.state;
        Ok(state
            .assignment_order
            .iter()
            .filter_map(|id| state.assignments.get(id))
            .filter(|a| a.is_led_by(officer_id) && a.workflow_stage != WorkflowStage::Completed)
            .map(|a| a.id)
            .collect())
    }

    fn hierarchy_entries(&mut self) -> TxResult<Vec<HierarchyEntry>> {
        Ok(self.state.hierarchy.clone())
    }

    fn next_sequence(&mut self, key: &str) -> TxResult<i64> {
        let value = self.state.sequences.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn insert_assignment(&mut self, assignment: &Assignment) -> TxResult<()> {
        if self
            .state
            .assignments
            .values()
            .any(|a| a.assignment_no == assignment.assignment_no)
        {
            return Err(duplicate(&assignment.assignment_no));
        }
        self.state.assignment_order.push(assignment.id);
        self.state
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(())
    }

    fn find_assignment(&mut self, id: Uuid) -> TxResult<Option<Assignment>> {
        Ok(self.state.assignments.get(&id).cloned())
    }

    fn lock_assignment(&mut self, id: Uuid) -> TxResult<Assignment> {
        self.find_assignment(id)?
            .ok_or_else(|| not_found("assignment", id))
    }

    fn update_assignment(&mut self, assignment: &Assignment) -> TxResult<()> {
        match self.state.assignments.get_mut(&assignment.id) {
            Some(slot) => {
                *slot = assignment.clone();
                Ok(())
            }
            None => Err(not_found("assignment", assignment.id)),
        }
    }

    fn expenditure_items(&mut self, assignment_id: Uuid) -> TxResult<Vec<ExpenditureItem>> {
        Ok(self
            .state
            .expenditure
            .get(&assignment_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_expenditure_items(
        &mut self,
        assignment_id: Uuid,
        items: &[ExpenditureItem],
    ) -> TxResult<()> {
        self.state.expenditure.insert(assignment_id, items.to_vec());
        Ok(())
    }

    fn team_members(&mut self, assignment_id: Uuid) -> TxResult<Vec<TeamMember>> {
        Ok(self.state.team.get(&assignment_id).cloned().unwrap_or_default())
    }

    fn replace_team_members(
        &mut self,
        assignment_id: Uuid,
        members: &[TeamMember],
    ) -> TxResult<()> {
        self.state.team.insert(assignment_id, members.to_vec());
        Ok(())
    }

    fn milestones(&mut self, assignment_id: Uuid) -> TxResult<Vec<Milestone>> {
        let mut list = self
            .state
            .milestones
            .get(&assignment_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by_key(|m| m.milestone_no);
        Ok(list)
    }

    fn replace_milestones(
        &mut self,
        assignment_id: Uuid,
        milestones: &[Milestone],
    ) -> TxResult<()> {
        self.state
            .milestones
            .insert(assignment_id, milestones.to_vec());
        Ok(())
    }

    fn update_milestone(&mut self, milestone: &Milestone) -> TxResult<()> {
        let slot = self
            .state
            .milestones
            .get_mut(&milestone.assignment_id)
            .and_then(|list| list.iter_mut().find(|m| m.id == milestone.id))
            .ok_or_else(|| not_found("milestone", milestone.id))?;
        *slot = milestone.clone();
        Ok(())
    }

    fn revenue_shares(&mut self, assignment_id: Uuid) -> TxResult<Vec<RevenueShare>> {
        Ok(self
            .state
            .shares
            .get(&assignment_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_revenue_shares(
        &mut self,
        assignment_id: Uuid,
        shares: &[RevenueShare],
    ) -> TxResult<()> {
        self.state.shares.insert(assignment_id, shares.to_vec());
        Ok(())
    }

    fn insert_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()> {
        self.state.requests.push(request.clone());
        Ok(())
    }

    fn find_approval_request(&mut self, id: Uuid) -> TxResult<Option<ApprovalRequest>> {
        Ok(self.state.requests.iter().find(|r| r.id == id).cloned())
    }

    fn lock_approval_request(&mut self, id: Uuid) -> TxResult<ApprovalRequest> {
        self.find_approval_request(id)?
            .ok_or_else(|| not_found("approval request", id))
    }

    fn update_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()> {
        let slot = self
            .state
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| not_found("approval request", request.id))?;
        *slot = request.clone();
        Ok(())
    }

    fn approval_requests_for(&mut self, reference_id: Uuid) -> TxResult<Vec<ApprovalRequest>> {
        Ok(self
            .state
            .requests
            .iter()
            .filter(|r| r.reference_id == reference_id)
            .cloned()
            .collect())
    }

    fn insert_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()> {
        if self
            .state
            .invoices
            .iter()
            .any(|i| i.request_number == invoice.request_number)
        {
            return Err(duplicate(&invoice.request_number));
        }
        self.state.invoices.push(invoice.clone());
        Ok(())
    }

    fn lock_invoice_request(&mut self, id: Uuid) -> TxResult<InvoiceRequest> {
        self.state
            .invoices
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| not_found("invoice request", id))
    }

    fn update_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()> {
        let slot = self
            .state
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| not_found("invoice request", invoice.id))?;
        *slot = invoice.clone();
        Ok(())
    }

    fn invoice_requests_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<InvoiceRequest>> {
        Ok(self
            .state
            .invoices
            .iter()
            .filter(|i| i.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    fn insert_payment_receipt(&mut self, receipt: &PaymentReceipt) -> TxResult<()> {
        if self
            .state
            .receipts
            .iter()
            .any(|r| r.invoice_request_id == receipt.invoice_request_id)
        {
            return Err(duplicate("payment receipt for invoice"));
        }
        self.state.receipts.push(receipt.clone());
        Ok(())
    }

    fn receipt_for_invoice(&mut self, invoice_id: Uuid) -> TxResult<Option<PaymentReceipt>> {
        Ok(self
            .state
            .receipts
            .iter()
            .find(|r| r.invoice_request_id == invoice_id)
            .cloned())
    }

    fn receipts_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<PaymentReceipt>> {
        let invoice_ids: Vec<Uuid> = self
            .state
            .invoices
            .iter()
            .filter(|i| i.assignment_id == assignment_id)
            .map(|i| i.id)
            .collect();
        Ok(self
            .state
            .receipts
            .iter()
            .filter(|r| invoice_ids.contains(&r.invoice_request_id))
            .cloned()
            .collect())
    }

    fn append_ledger_entries(&mut self, entries: &[LedgerEntry]) -> TxResult<()> {
        for entry in entries {
            let clash = self.state.ledger.iter().any(|e| {
                e.source_id == entry.source_id
                    && e.revenue_type == entry.revenue_type
                    && e.officer_id == entry.officer_id
            });
            if clash {
                return Err(duplicate("ledger entry for source"));
            }
            self.state.ledger.push(entry.clone());
        }
        Ok(())
    }

    fn ledger_entries_for_source(
        &mut self,
        source_id: Uuid,
        revenue_type: RevenueType,
    ) -> TxResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .state
            .ledger
            .iter()
            .filter(|e| e.source_id == source_id && e.revenue_type == revenue_type)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.officer_id.cmp(&b.officer_id));
        Ok(entries)
    }

    fn ledger_entries_for_officer(
        &mut self,
        officer_id: &str,
        fy_period: &str,
    ) -> TxResult<Vec<LedgerEntry>> {
        Ok(self
            .state
            .ledger
            .iter()
            .filter(|e| e.officer_id == officer_id && e.fy_period == fy_period)
            .cloned()
            .collect())
    }

    fn log_activity(&mut self, record: &ActivityRecord) -> TxResult<()> {
        self.state.activity.push(record.clone());
        Ok(())
    }
}
