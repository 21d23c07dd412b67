use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::types::{HierarchyEntry, Officer, RoleAssignment};
use crate::core::shared::schema::{
    activity_log, approval_requests, assignment_team, assignments, expenditure_items,
    invoice_requests, milestones, officer_revenue_ledger, officer_roles,
    payment_receipts, reporting_hierarchy, revenue_shares,
};
use crate::error::WorkflowError;
use crate::ledger::types::{InvoiceRequest, LedgerEntry, PaymentReceipt};
use crate::workflow::types::{
    ActivityRecord, ApprovalRequest, Assignment, ExpenditureItem, Milestone, RevenueShare,
    SectionStatuses, TeamMember,
};

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct DbOfficer {
    pub officer_id: String,
    pub name: String,
    pub office_id: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = officer_roles)]
pub struct DbOfficerRole {
    pub id: Uuid,
    pub officer_id: String,
    pub role_type: String,
    pub scope_type: String,
    pub scope_value: Option<String>,
    pub is_primary: bool,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = reporting_hierarchy)]
pub struct DbHierarchyEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_value: String,
    pub group_code: Option<String>,
    pub reports_to_role: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = assignments)]
#[diesel(treat_none_as_null = true)]
pub struct DbAssignment {
    pub id: Uuid,
    pub assignment_no: String,
    pub assignment_type: String,
    pub title: String,
    pub client: Option<String>,
    pub client_type: Option<String>,
    pub office_id: String,
    pub team_leader_officer_id: Option<String>,
    pub registered_by: String,
    pub workflow_stage: String,
    pub registration_status: String,
    pub approval_status: String,
    pub cost_approval_status: String,
    pub team_approval_status: String,
    pub milestone_approval_status: String,
    pub revenue_approval_status: String,
    pub status: String,
    pub total_value: BigDecimal,
    pub man_days: Option<BigDecimal>,
    pub is_notional: bool,
    pub tor_scope: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub details_filled: bool,
    pub invoice_raised_amount: BigDecimal,
    pub payment_received_amount: BigDecimal,
    pub physical_progress_percent: f64,
    pub timeline_progress_percent: f64,
    pub remarks: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = expenditure_items)]
pub struct DbExpenditureItem {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub head_code: String,
    pub estimated_amount: BigDecimal,
    pub actual_amount: BigDecimal,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = assignment_team)]
pub struct DbTeamMember {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub officer_id: String,
    pub role: String,
    pub assigned_by: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = milestones)]
#[diesel(treat_none_as_null = true)]
pub struct DbMilestone {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub milestone_no: i32,
    pub title: String,
    pub target_date: Option<NaiveDate>,
    pub actual_completion_date: Option<NaiveDate>,
    pub invoice_percent: BigDecimal,
    pub invoice_amount: BigDecimal,
    pub invoice_raised: bool,
    pub invoice_raised_date: Option<NaiveDate>,
    pub payment_received: bool,
    pub payment_received_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = revenue_shares)]
pub struct DbRevenueShare {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub officer_id: String,
    pub share_percent: BigDecimal,
    pub share_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = approval_requests)]
#[diesel(treat_none_as_null = true)]
pub struct DbApprovalRequest {
    pub id: Uuid,
    pub request_type: String,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub requested_by: String,
    pub office_id: String,
    pub status: String,
    pub review_status: Option<String>,
    pub request_data: serde_json::Value,
    pub remarks: Option<String>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub approval_remarks: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub escalated_to: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = invoice_requests)]
#[diesel(treat_none_as_null = true)]
pub struct DbInvoiceRequest {
    pub id: Uuid,
    pub request_number: String,
    pub assignment_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub invoice_type: String,
    pub invoice_amount: BigDecimal,
    pub fy_period: String,
    pub description: Option<String>,
    pub status: String,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_remarks: Option<String>,
    pub revenue_recognized_80: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = payment_receipts)]
pub struct DbPaymentReceipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub invoice_request_id: Uuid,
    pub amount_received: BigDecimal,
    pub receipt_date: NaiveDate,
    pub payment_mode: String,
    pub reference_number: Option<String>,
    pub fy_period: String,
    pub remarks: Option<String>,
    pub revenue_recognized_20: BigDecimal,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = officer_revenue_ledger)]
pub struct DbLedgerEntry {
    pub id: Uuid,
    pub officer_id: String,
    pub assignment_id: Uuid,
    pub invoice_request_id: Option<Uuid>,
    pub payment_receipt_id: Option<Uuid>,
    pub source_id: Uuid,
    pub revenue_type: String,
    pub share_percent: BigDecimal,
    pub amount: BigDecimal,
    pub fy_period: String,
    pub transaction_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = activity_log)]
pub struct DbActivity {
    pub id: Uuid,
    pub actor_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// CONVERSIONS
// ============================================================================

pub fn db_officer_to_officer(db: DbOfficer) -> Officer {
    Officer {
        officer_id: db.officer_id,
        name: db.name,
        office_id: db.office_id,
        is_active: db.is_active,
    }
}

pub fn db_role_to_role(db: DbOfficerRole) -> Result<RoleAssignment, WorkflowError> {
    Ok(RoleAssignment {
        officer_id: db.officer_id,
        role_type: db.role_type.parse()?,
        scope_type: db.scope_type.parse()?,
        scope_value: db.scope_value,
        is_primary: db.is_primary,
        effective_from: db.effective_from,
        effective_to: db.effective_to,
    })
}

pub fn db_hierarchy_to_entry(db: DbHierarchyEntry) -> Result<HierarchyEntry, WorkflowError> {
    Ok(HierarchyEntry {
        entity_type: db.entity_type.parse()?,
        entity_value: db.entity_value,
        group_code: db.group_code,
        reports_to_role: db.reports_to_role.parse()?,
        effective_from: db.effective_from,
        effective_to: db.effective_to,
    })
}

pub fn db_assignment_to_assignment(db: DbAssignment) -> Result<Assignment, WorkflowError> {
    Ok(Assignment {
        id: db.id,
        assignment_no: db.assignment_no,
        assignment_type: db.assignment_type.parse()?,
        title: db.title,
        client: db.client,
        client_type: db.client_type,
        office_id: db.office_id,
        team_leader_officer_id: db.team_leader_officer_id,
        registered_by: db.registered_by,
        workflow_stage: db.workflow_stage.parse()?,
        registration_status: db.registration_status.parse()?,
        sections: SectionStatuses {
            basic: db.approval_status.parse()?,
            cost: db.cost_approval_status.parse()?,
            team: db.team_approval_status.parse()?,
            milestone: db.milestone_approval_status.parse()?,
            revenue: db.revenue_approval_status.parse()?,
        },
        status: db.status.parse()?,
        total_value: db.total_value,
        man_days: db.man_days,
        is_notional: db.is_notional,
        tor_scope: db.tor_scope,
        start_date: db.start_date,
        target_date: db.target_date,
        details_filled: db.details_filled,
        invoice_raised_amount: db.invoice_raised_amount,
        payment_received_amount: db.payment_received_amount,
        physical_progress_percent: db.physical_progress_percent,
        timeline_progress_percent: db.timeline_progress_percent,
        remarks: db.remarks,
        version: db.version,
        created_at: db.created_at,
        updated_at: db.updated_at,
    })
}

pub fn assignment_to_db(a: &Assignment) -> DbAssignment {
    DbAssignment {
        id: a.id,
        assignment_no: a.assignment_no.clone(),
        assignment_type: a.assignment_type.to_string(),
        title: a.title.clone(),
        client: a.client.clone(),
        client_type: a.client_type.clone(),
        office_id: a.office_id.clone(),
        team_leader_officer_id: a.team_leader_officer_id.clone(),
        registered_by: a.registered_by.clone(),
        workflow_stage: a.workflow_stage.to_string(),
        registration_status: a.registration_status.to_string(),
        approval_status: a.sections.basic.to_string(),
        cost_approval_status: a.sections.cost.to_string(),
        team_approval_status: a.sections.team.to_string(),
        milestone_approval_status: a.sections.milestone.to_string(),
        revenue_approval_status: a.sections.revenue.to_string(),
        status: a.status.to_string(),
        total_value: a.total_value.clone(),
        man_days: a.man_days.clone(),
        is_notional: a.is_notional,
        tor_scope: a.tor_scope.clone(),
        start_date: a.start_date,
        target_date: a.target_date,
        details_filled: a.details_filled,
        invoice_raised_amount: a.invoice_raised_amount.clone(),
        payment_received_amount: a.payment_received_amount.clone(),
        physical_progress_percent: a.physical_progress_percent,
        timeline_progress_percent: a.timeline_progress_percent,
        remarks: a.remarks.clone(),
        version: a.version,
        created_at: a.created_at,
        updated_at: a.updated_at,
    }
}

pub fn db_expenditure_to_item(db: DbExpenditureItem) -> ExpenditureItem {
    ExpenditureItem {
        id: db.id,
        assignment_id: db.assignment_id,
        head_code: db.head_code,
        estimated_amount: db.estimated_amount,
        actual_amount: db.actual_amount,
        remarks: db.remarks,
        created_at: db.created_at,
    }
}

pub fn expenditure_to_db(item: &ExpenditureItem) -> DbExpenditureItem {
    DbExpenditureItem {
        id: item.id,
        assignment_id: item.assignment_id,
        head_code: item.head_code.clone(),
        estimated_amount: item.estimated_amount.clone(),
        actual_amount: item.actual_amount.clone(),
        remarks: item.remarks.clone(),
        created_at: item.created_at,
    }
}

pub fn db_team_to_member(db: DbTeamMember) -> Result<TeamMember, WorkflowError> {
    Ok(TeamMember {
        id: db.id,
        assignment_id: db.assignment_id,
        officer_id: db.officer_id,
        role: db.role.parse()?,
        assigned_by: db.assigned_by,
        assigned_at: db.assigned_at,
        is_active: db.is_active,
    })
}

pub fn team_to_db(member: &TeamMember) -> DbTeamMember {
    DbTeamMember {
        id: member.id,
        assignment_id: member.assignment_id,
        officer_id: member.officer_id.clone(),
        role: member.role.to_string(),
        assigned_by: member.assigned_by.clone(),
        assigned_at: member.assigned_at,
        is_active: member.is_active,
    }
}

pub fn db_milestone_to_milestone(db: DbMilestone) -> Result<Milestone, WorkflowError> {
    Ok(Milestone {
        id: db.id,
        assignment_id: db.assignment_id,
        milestone_no: db.milestone_no,
        title: db.title,
        target_date: db.target_date,
        actual_completion_date: db.actual_completion_date,
        invoice_percent: db.invoice_percent,
        invoice_amount: db.invoice_amount,
        invoice_raised: db.invoice_raised,
        invoice_raised_date: db.invoice_raised_date,
        payment_received: db.payment_received,
        payment_received_date: db.payment_received_date,
        status: db.status.parse()?,
        created_at: db.created_at,
        updated_at: db.updated_at,
    })
}

pub fn milestone_to_db(m: &Milestone) -> DbMilestone {
    DbMilestone {
        id: m.id,
        assignment_id: m.assignment_id,
        milestone_no: m.milestone_no,
        title: m.title.clone(),
        target_date: m.target_date,
        actual_completion_date: m.actual_completion_date,
        invoice_percent: m.invoice_percent.clone(),
        invoice_amount: m.invoice_amount.clone(),
        invoice_raised: m.invoice_raised,
        invoice_raised_date: m.invoice_raised_date,
        payment_received: m.payment_received,
        payment_received_date: m.payment_received_date,
        status: m.status.to_string(),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

pub fn db_share_to_share(db: DbRevenueShare) -> RevenueShare {
    RevenueShare {
        id: db.id,
        assignment_id: db.assignment_id,
        officer_id: db.officer_id,
        share_percent: db.share_percent,
        share_amount: db.share_amount,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub fn share_to_db(share: &RevenueShare) -> DbRevenueShare {
    DbRevenueShare {
        id: share.id,
        assignment_id: share.assignment_id,
        officer_id: share.officer_id.clone(),
        share_percent: share.share_percent.clone(),
        share_amount: share.share_amount.clone(),
        created_at: share.created_at,
        updated_at: share.updated_at,
    }
}

pub fn db_request_to_request(db: DbApprovalRequest) -> Result<ApprovalRequest, WorkflowError> {
    Ok(ApprovalRequest {
        id: db.id,
        request_type: db.request_type.parse()?,
        reference_type: db.reference_type,
        reference_id: db.reference_id,
        requested_by: db.requested_by,
        office_id: db.office_id,
        status: db.status.parse()?,
        review_status: db.review_status.map(|s| s.parse()).transpose()?,
        request_data: db.request_data,
        remarks: db.remarks,
        reviewed_by: db.reviewed_by,
        review_notes: db.review_notes,
        approval_remarks: db.approval_remarks,
        approved_by: db.approved_by,
        approved_at: db.approved_at,
        escalated_to: db.escalated_to,
        escalated_at: db.escalated_at,
        created_at: db.created_at,
        updated_at: db.updated_at,
    })
}

pub fn request_to_db(r: &ApprovalRequest) -> DbApprovalRequest {
    DbApprovalRequest {
        id: r.id,
        request_type: r.request_type.to_string(),
        reference_type: r.reference_type.clone(),
        reference_id: r.reference_id,
        requested_by: r.requested_by.clone(),
        office_id: r.office_id.clone(),
        status: r.status.to_string(),
        review_status: r.review_status.map(|s| s.to_string()),
        request_data: r.request_data.clone(),
        remarks: r.remarks.clone(),
        reviewed_by: r.reviewed_by.clone(),
        review_notes: r.review_notes.clone(),
        approval_remarks: r.approval_remarks.clone(),
        approved_by: r.approved_by.clone(),
        approved_at: r.approved_at,
        escalated_to: r.escalated_to.clone(),
        escalated_at: r.escalated_at,
        created_at: r.created_at,
        updated_at: r.updated_at,
    }
}

pub fn db_invoice_to_invoice(db: DbInvoiceRequest) -> Result<InvoiceRequest, WorkflowError> {
    Ok(InvoiceRequest {
        id: db.id,
        request_number: db.request_number,
        assignment_id: db.assignment_id,
        milestone_id: db.milestone_id,
        invoice_type: db.invoice_type.parse()?,
        invoice_amount: db.invoice_amount,
        fy_period: db.fy_period,
        description: db.description,
        status: db.status.parse()?,
        requested_by: db.requested_by,
        approved_by: db.approved_by,
        approved_at: db.approved_at,
        approval_remarks: db.approval_remarks,
        revenue_recognized_80: db.revenue_recognized_80,
        created_at: db.created_at,
        updated_at: db.updated_at,
    })
}

pub fn invoice_to_db(i: &InvoiceRequest) -> DbInvoiceRequest {
    DbInvoiceRequest {
        id: i.id,
        request_number: i.request_number.clone(),
        assignment_id: i.assignment_id,
        milestone_id: i.milestone_id,
        invoice_type: i.invoice_type.to_string(),
        invoice_amount: i.invoice_amount.clone(),
        fy_period: i.fy_period.clone(),
        description: i.description.clone(),
        status: i.status.to_string(),
        requested_by: i.requested_by.clone(),
        approved_by: i.approved_by.clone(),
        approved_at: i.approved_at,
        approval_remarks: i.approval_remarks.clone(),
        revenue_recognized_80: i.revenue_recognized_80.clone(),
        created_at: i.created_at,
        updated_at: i.updated_at,
    }
}

pub fn db_receipt_to_receipt(db: DbPaymentReceipt) -> Result<PaymentReceipt, WorkflowError> {
    Ok(PaymentReceipt {
        id: db.id,
        receipt_number: db.receipt_number,
        invoice_request_id: db.invoice_request_id,
        amount_received: db.amount_received,
        receipt_date: db.receipt_date,
        payment_mode: db.payment_mode.parse()?,
        reference_number: db.reference_number,
        fy_period: db.fy_period,
        remarks: db.remarks,
        revenue_recognized_20: db.revenue_recognized_20,
        updated_by: db.updated_by,
        created_at: db.created_at,
    })
}

pub fn receipt_to_db(r: &PaymentReceipt) -> DbPaymentReceipt {
    DbPaymentReceipt {
        id: r.id,
        receipt_number: r.receipt_number.clone(),
        invoice_request_id: r.invoice_request_id,
        amount_received: r.amount_received.clone(),
        receipt_date: r.receipt_date,
        payment_mode: r.payment_mode.to_string(),
        reference_number: r.reference_number.clone(),
        fy_period: r.fy_period.clone(),
        remarks: r.remarks.clone(),
        revenue_recognized_20: r.revenue_recognized_20.clone(),
        updated_by: r.updated_by.clone(),
        created_at: r.created_at,
    }
}

pub fn db_ledger_to_entry(db: DbLedgerEntry) -> Result<LedgerEntry, WorkflowError> {
    Ok(LedgerEntry {
        id: db.id,
        officer_id: db.officer_id,
        assignment_id: db.assignment_id,
        invoice_request_id: db.invoice_request_id,
        payment_receipt_id: db.payment_receipt_id,
        source_id: db.source_id,
        revenue_type: db.revenue_type.parse()?,
        share_percent: db.share_percent,
        amount: db.amount,
        fy_period: db.fy_period,
        transaction_date: db.transaction_date,
        remarks: db.remarks,
        created_at: db.created_at,
    })
}

pub fn ledger_to_db(e: &LedgerEntry) -> DbLedgerEntry {
    DbLedgerEntry {
        id: e.id,
        officer_id: e.officer_id.clone(),
        assignment_id: e.assignment_id,
        invoice_request_id: e.invoice_request_id,
        payment_receipt_id: e.payment_receipt_id,
        source_id: e.source_id,
        revenue_type: e.revenue_type.to_string(),
        share_percent: e.share_percent.clone(),
        amount: e.amount.clone(),
        fy_period: e.fy_period.clone(),
        transaction_date: e.transaction_date,
        remarks: e.remarks.clone(),
        created_at: e.created_at,
    }
}

pub fn activity_to_db(a: &ActivityRecord) -> DbActivity {
    DbActivity {
        id: a.id,
        actor_id: a.actor_id.clone(),
        action: a.action.clone(),
        entity_type: a.entity_type.clone(),
        entity_id: a.entity_id,
        remarks: a.remarks.clone(),
        created_at: a.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::{SectionStatus, WorkflowStage};

    fn sample_row() -> DbAssignment {
        let now = Utc::now();
        DbAssignment {
            id: Uuid::new_v4(),
            assignment_no: "NPC/O1/ASG/001/2025-26".into(),
            assignment_type: "ASSIGNMENT".into(),
            title: "Energy audit".into(),
            client: Some("Acme".into()),
            client_type: None,
            office_id: "O1".into(),
            team_leader_officer_id: None,
            registered_by: "OFF1".into(),
            workflow_stage: "DETAIL_ENTRY".into(),
            registration_status: "APPROVED".into(),
            approval_status: "APPROVED".into(),
            cost_approval_status: "SUBMITTED".into(),
            team_approval_status: "DRAFT".into(),
            milestone_approval_status: "REJECTED".into(),
            revenue_approval_status: "DRAFT".into(),
            status: "Not Started".into(),
            total_value: BigDecimal::from(0),
            man_days: None,
            is_notional: false,
            tor_scope: None,
            start_date: None,
            target_date: None,
            details_filled: false,
            invoice_raised_amount: BigDecimal::from(0),
            payment_received_amount: BigDecimal::from(0),
            physical_progress_percent: 0.0,
            timeline_progress_percent: 0.0,
            remarks: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_assignment_row_round_trips_section_columns() {
        let row = sample_row();
        let assignment = db_assignment_to_assignment(row.clone()).unwrap();
        assert_eq!(assignment.workflow_stage, WorkflowStage::DetailEntry);
        assert_eq!(assignment.sections.basic, SectionStatus::Approved);
        assert_eq!(assignment.sections.milestone, SectionStatus::Rejected);

        let back = assignment_to_db(&assignment);
        assert_eq!(back.cost_approval_status, row.cost_approval_status);
        assert_eq!(back.status, "Not Started");
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let mut row = sample_row();
        row.workflow_stage = "ARCHIVED".into();
        assert!(db_assignment_to_assignment(row).is_err());
    }
}
