use diesel::prelude::*;
use diesel::PgConnection;
use log::error;
use uuid::Uuid;

use crate::authz::types::{HierarchyEntry, Officer, RoleAssignment};
use crate::core::shared::enums::{RevenueType, WorkflowStage};
use crate::core::shared::schema::{
    activity_log, approval_requests, assignment_team, assignments, document_sequences,
    expenditure_items, invoice_requests, milestones, officer_revenue_ledger, officer_roles,
    officers, payment_receipts, reporting_hierarchy, revenue_shares,
};
use crate::core::shared::utils::DbPool;
use crate::error::WorkflowError;
use crate::ledger::types::{InvoiceRequest, LedgerEntry, PaymentReceipt};
use crate::workflow::types::{
    ActivityRecord, ApprovalRequest, Assignment, ExpenditureItem, Milestone, RevenueShare,
    TeamMember,
};

use super::models::*;
use super::{Store, StoreTx, TxResult};

/// PostgreSQL-backed store. Each unit of work runs in one database
/// transaction on a pooled connection.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Store for PgStore {
    fn run(
        &self,
        work: &mut dyn FnMut(&mut dyn StoreTx) -> TxResult<()>,
    ) -> TxResult<()> {
        let mut pooled = self.pool.get().map_err(|e| {
            error!("Failed to get database connection: {}", e);
            WorkflowError::Database(e.to_string())
        })?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<(), WorkflowError, _>(|conn| {
            let mut tx = PgTx { conn };
            work(&mut tx)
        })
    }
}

pub struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

fn not_found(what: &str, id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("{} {} not found", what, id))
}

impl StoreTx for PgTx<'_> {
    fn officer(&mut self, officer_id: &str) -> TxResult<Option<Officer>> {
        let row = officers::table
            .find(officer_id)
            .first::<DbOfficer>(self.conn)
            .optional()?;
        Ok(row.map(db_officer_to_officer))
    }

    fn role_assignments(&mut self, officer_id: &str) -> TxResult<Vec<RoleAssignment>> {
        officer_roles::table
            .filter(officer_roles::officer_id.eq(officer_id))
            .load::<DbOfficerRole>(self.conn)?
            .into_iter()
            .map(db_role_to_role)
            .collect()
    }

    fn assignments_led_by(&mut self, officer_id: &str) -> TxResult<Vec<Uuid>> {
        let ids = assignments::table
            .filter(assignments::team_leader_officer_id.eq(officer_id))
            .filter(assignments::workflow_stage.ne(WorkflowStage::Completed.as_str()))
            .order(assignments::created_at.asc())
            .select(assignments::id)
            .load::<Uuid>(self.conn)?;
        Ok(ids)
    }

    fn hierarchy_entries(&mut self) -> TxResult<Vec<HierarchyEntry>> {
        reporting_hierarchy::table
            .load::<DbHierarchyEntry>(self.conn)?
            .into_iter()
            .map(db_hierarchy_to_entry)
            .collect()
    }

    fn next_sequence(&mut self, key: &str) -> TxResult<i64> {
        let value = diesel::insert_into(document_sequences::table)
            .values((
                document_sequences::sequence_key.eq(key),
                document_sequences::last_value.eq(1i64),
            ))
            .on_conflict(document_sequences::sequence_key)
            .do_update()
            .set(document_sequences::last_value.eq(document_sequences::last_value + 1i64))
            .returning(document_sequences::last_value)
            .get_result::<i64>(self.conn)?;
        Ok(value)
    }

    fn insert_assignment(&mut self, assignment: &Assignment) -> TxResult<()> {
        diesel::insert_into(assignments::table)
            .values(&assignment_to_db(assignment))
            .execute(self.conn)?;
        Ok(())
    }

    fn find_assignment(&mut self, id: Uuid) -> TxResult<Option<Assignment>> {
        assignments::table
            .find(id)
            .first::<DbAssignment>(self.conn)
            .optional()?
            .map(db_assignment_to_assignment)
            .transpose()
    }

    fn lock_assignment(&mut self, id: Uuid) -> TxResult<Assignment> {
        let row = assignments::table
            .find(id)
            .for_update()
            .first::<DbAssignment>(self.conn)
            .optional()?
            .ok_or_else(|| not_found("assignment", id))?;
        db_assignment_to_assignment(row)
    }

    fn update_assignment(&mut self, assignment: &Assignment) -> TxResult<()> {
        diesel::update(assignments::table.find(assignment.id))
            .set(&assignment_to_db(assignment))
            .execute(self.conn)?;
        Ok(())
    }

    fn expenditure_items(&mut self, assignment_id: Uuid) -> TxResult<Vec<ExpenditureItem>> {
        let rows = expenditure_items::table
            .filter(expenditure_items::assignment_id.eq(assignment_id))
            .order(expenditure_items::created_at.asc())
            .load::<DbExpenditureItem>(self.conn)?;
        Ok(rows.into_iter().map(db_expenditure_to_item).collect())
    }

    fn replace_expenditure_items(
        &mut self,
        assignment_id: Uuid,
        items: &[ExpenditureItem],
    ) -> TxResult<()> {
        diesel::delete(
            expenditure_items::table.filter(expenditure_items::assignment_id.eq(assignment_id)),
        )
        .execute(self.conn)?;
        if !items.is_empty() {
            let rows: Vec<DbExpenditureItem> = items.iter().map(expenditure_to_db).collect();
            diesel::insert_into(expenditure_items::table)
                .values(&rows)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn team_members(&mut self, assignment_id: Uuid) -> TxResult<Vec<TeamMember>> {
        assignment_team::table
            .filter(assignment_team::assignment_id.eq(assignment_id))
            .order(assignment_team::assigned_at.asc())
            .load::<DbTeamMember>(self.conn)?
            .into_iter()
            .map(db_team_to_member)
            .collect()
    }

    fn replace_team_members(
        &mut self,
        assignment_id: Uuid,
        members: &[TeamMember],
    ) -> TxResult<()> {
        diesel::delete(
            assignment_team::table.filter(assignment_team::assignment_id.eq(assignment_id)),
        )
        .execute(self.conn)?;
        if !members.is_empty() {
            let rows: Vec<DbTeamMember> = members.iter().map(team_to_db).collect();
            diesel::insert_into(assignment_team::table)
                .values(&rows)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn milestones(&mut self, assignment_id: Uuid) -> TxResult<Vec<Milestone>> {
        milestones::table
            .filter(milestones::assignment_id.eq(assignment_id))
            .order(milestones::milestone_no.asc())
            .load::<DbMilestone>(self.conn)?
            .into_iter()
            .map(db_milestone_to_milestone)
            .collect()
    }

    fn replace_milestones(
        &mut self,
        assignment_id: Uuid,
        items: &[Milestone],
    ) -> TxResult<()> {
        diesel::delete(milestones::table.filter(milestones::assignment_id.eq(assignment_id)))
            .execute(self.conn)?;
        if !items.is_empty() {
            let rows: Vec<DbMilestone> = items.iter().map(milestone_to_db).collect();
            diesel::insert_into(milestones::table)
                .values(&rows)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn update_milestone(&mut self, milestone: &Milestone) -> TxResult<()> {
        let updated = diesel::update(milestones::table.find(milestone.id))
            .set(&milestone_to_db(milestone))
            .execute(self.conn)?;
        if updated == 0 {
            return Err(not_found("milestone", milestone.id));
        }
        Ok(())
    }

    fn revenue_shares(&mut self, assignment_id: Uuid) -> TxResult<Vec<RevenueShare>> {
        let rows = revenue_shares::table
            .filter(revenue_shares::assignment_id.eq(assignment_id))
            .order((revenue_shares::created_at.asc(), revenue_shares::officer_id.asc()))
            .load::<DbRevenueShare>(self.conn)?;
        Ok(rows.into_iter().map(db_share_to_share).collect())
    }

    fn replace_revenue_shares(
        &mut self,
        assignment_id: Uuid,
        shares: &[RevenueShare],
    ) -> TxResult<()> {
        diesel::delete(
            revenue_shares::table.filter(revenue_shares::assignment_id.eq(assignment_id)),
        )
        .execute(self.conn)?;
        if !shares.is_empty() {
            let rows: Vec<DbRevenueShare> = shares.iter().map(share_to_db).collect();
            diesel::insert_into(revenue_shares::table)
                .values(&rows)
                .execute(self.conn)?;
        }
        Ok(())
    }

    fn insert_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()> {
        diesel::insert_into(approval_requests::table)
            .values(&request_to_db(request))
            .execute(self.conn)?;
        Ok(())
    }

    fn find_approval_request(&mut self, id: Uuid) -> TxResult<Option<ApprovalRequest>> {
        approval_requests::table
            .find(id)
            .first::<DbApprovalRequest>(self.conn)
            .optional()?
            .map(db_request_to_request)
            .transpose()
    }

    fn lock_approval_request(&mut self, id: Uuid) -> TxResult<ApprovalRequest> {
        let row = approval_requests::table
            .find(id)
            .for_update()
            .first::<DbApprovalRequest>(self.conn)
            .optional()?
            .ok_or_else(|| not_found("approval request", id))?;
        db_request_to_request(row)
    }

    fn update_approval_request(&mut self, request: &ApprovalRequest) -> TxResult<()> {
        diesel::update(approval_requests::table.find(request.id))
            .set(&request_to_db(request))
            .execute(self.conn)?;
        Ok(())
    }

    fn approval_requests_for(&mut self, reference_id: Uuid) -> TxResult<Vec<ApprovalRequest>> {
        approval_requests::table
            .filter(approval_requests::reference_id.eq(reference_id))
            .order(approval_requests::created_at.asc())
            .load::<DbApprovalRequest>(self.conn)?
            .into_iter()
            .map(db_request_to_request)
            .collect()
    }

    fn insert_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()> {
        diesel::insert_into(invoice_requests::table)
            .values(&invoice_to_db(invoice))
            .execute(self.conn)?;
        Ok(())
    }

    fn lock_invoice_request(&mut self, id: Uuid) -> TxResult<InvoiceRequest> {
        let row = invoice_requests::table
            .find(id)
            .for_update()
            .first::<DbInvoiceRequest>(self.conn)
            .optional()?
            .ok_or_else(|| not_found("invoice request", id))?;
        db_invoice_to_invoice(row)
    }

    fn update_invoice_request(&mut self, invoice: &InvoiceRequest) -> TxResult<()> {
        diesel::update(invoice_requests::table.find(invoice.id))
            .set(&invoice_to_db(invoice))
            .execute(self.conn)?;
        Ok(())
    }

    fn invoice_requests_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<InvoiceRequest>> {
        invoice_requests::table
            .filter(invoice_requests::assignment_id.eq(assignment_id))
            .order(invoice_requests::created_at.asc())
            .load::<DbInvoiceRequest>(self.conn)?
            .into_iter()
            .map(db_invoice_to_invoice)
            .collect()
    }

    fn insert_payment_receipt(&mut self, receipt: &PaymentReceipt) -> TxResult<()> {
        diesel::insert_into(payment_receipts::table)
            .values(&receipt_to_db(receipt))
            .execute(self.conn)?;
        Ok(())
    }

    fn receipt_for_invoice(&mut self, invoice_id: Uuid) -> TxResult<Option<PaymentReceipt>> {
        payment_receipts::table
            .filter(payment_receipts::invoice_request_id.eq(invoice_id))
            .first::<DbPaymentReceipt>(self.conn)
            .optional()?
            .map(db_receipt_to_receipt)
            .transpose()
    }

    fn receipts_for(&mut self, assignment_id: Uuid) -> TxResult<Vec<PaymentReceipt>> {
        payment_receipts::table
            .inner_join(invoice_requests::table)
            .filter(invoice_requests::assignment_id.eq(assignment_id))
            .select(payment_receipts::all_columns)
            .order(payment_receipts::created_at.asc())
            .load::<DbPaymentReceipt>(self.conn)?
            .into_iter()
            .map(db_receipt_to_receipt)
            .collect()
    }

    fn append_ledger_entries(&mut self, entries: &[LedgerEntry]) -> TxResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let rows: Vec<DbLedgerEntry> = entries.iter().map(ledger_to_db).collect();
        diesel::insert_into(officer_revenue_ledger::table)
            .values(&rows)
            .execute(self.conn)?;
        Ok(())
    }

    fn ledger_entries_for_source(
        &mut self,
        source_id: Uuid,
        revenue_type: RevenueType,
    ) -> TxResult<Vec<LedgerEntry>> {
        officer_revenue_ledger::table
            .filter(officer_revenue_ledger::source_id.eq(source_id))
            .filter(officer_revenue_ledger::revenue_type.eq(revenue_type.as_str()))
            .order(officer_revenue_ledger::officer_id.asc())
            .load::<DbLedgerEntry>(self.conn)?
            .into_iter()
            .map(db_ledger_to_entry)
            .collect()
    }

    fn ledger_entries_for_officer(
        &mut self,
        officer_id: &str,
        fy_period: &str,
    ) -> TxResult<Vec<LedgerEntry>> {
        officer_revenue_ledger::table
            .filter(officer_revenue_ledger::officer_id.eq(officer_id))
            .filter(officer_revenue_ledger::fy_period.eq(fy_period))
            .order(officer_revenue_ledger::transaction_date.asc())
            .load::<DbLedgerEntry>(self.conn)?
            .into_iter()
            .map(db_ledger_to_entry)
            .collect()
    }

    fn log_activity(&mut self, record: &ActivityRecord) -> TxResult<()> {
        diesel::insert_into(activity_log::table)
            .values(&activity_to_db(record))
            .execute(self.conn)?;
        Ok(())
    }
}
