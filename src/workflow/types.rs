use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::{
    ApprovalRequestType, AssignmentType, ChangeType, MilestoneStatus, OperationalStatus,
    RegistrationStatus, RequestStatus, ReviewStatus, Section, SectionStatus, TeamRole,
    WorkflowStage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatuses {
    pub basic: SectionStatus,
    pub cost: SectionStatus,
    pub team: SectionStatus,
    pub milestone: SectionStatus,
    pub revenue: SectionStatus,
}

impl Default for SectionStatuses {
    fn default() -> Self {
        Self {
            basic: SectionStatus::Draft,
            cost: SectionStatus::Draft,
            team: SectionStatus::Draft,
            milestone: SectionStatus::Draft,
            revenue: SectionStatus::Draft,
        }
    }
}

impl SectionStatuses {
    pub fn get(&self, section: Section) -> SectionStatus {
        match section {
            Section::Basic => self.basic,
            Section::Cost => self.cost,
            Section::Team => self.team,
            Section::Milestone => self.milestone,
            Section::Revenue => self.revenue,
        }
    }

    pub fn set(&mut self, section: Section, status: SectionStatus) {
        match section {
            Section::Basic => self.basic = status,
            Section::Cost => self.cost = status,
            Section::Team => self.team = status,
            Section::Milestone => self.milestone = status,
            Section::Revenue => self.revenue = status,
        }
    }

    pub fn all_approved(&self) -> bool {
        Section::ALL
            .iter()
            .all(|section| self.get(*section) == SectionStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub assignment_no: String,
    #[serde(rename = "type")]
    pub assignment_type: AssignmentType,
    pub title: String,
    pub client: Option<String>,
    pub client_type: Option<String>,
    pub office_id: String,
    pub team_leader_officer_id: Option<String>,
    pub registered_by: String,
    pub workflow_stage: WorkflowStage,
    pub registration_status: RegistrationStatus,
    pub sections: SectionStatuses,
    pub status: OperationalStatus,
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

impl Assignment {
    pub fn is_led_by(&self, officer_id: &str) -> bool {
        self.team_leader_officer_id.as_deref() == Some(officer_id)
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenditureItem {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub head_code: String,
    pub estimated_amount: BigDecimal,
    pub actual_amount: BigDecimal,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub officer_id: String,
    pub role: TeamRole,
    pub assigned_by: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
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
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueShare {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub officer_id: String,
    pub share_percent: BigDecimal,
    pub share_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub request_type: ApprovalRequestType,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub requested_by: String,
    pub office_id: String,
    pub status: RequestStatus,
    pub review_status: Option<ReviewStatus>,
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

impl ApprovalRequest {
    pub fn change_type(&self) -> Option<ChangeType> {
        self.request_data
            .get("change_type")
            .and_then(|v| v.as_str())
            .and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub actor_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(actor_id: &str, action: &str, entity_type: &str, entity_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            remarks: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }
}

// ============================================================================
// REQUEST PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterAssignmentRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub assignment_type: Option<String>,
    pub office_id: Option<String>,
    pub client: Option<String>,
    pub client_type: Option<String>,
    pub total_value: Option<BigDecimal>,
    pub man_days: Option<BigDecimal>,
    pub tor_scope: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicDetailsUpdate {
    pub title: Option<String>,
    pub client: Option<String>,
    pub client_type: Option<String>,
    pub tor_scope: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub total_value: Option<BigDecimal>,
    pub man_days: Option<BigDecimal>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenditureInput {
    pub head_code: String,
    pub estimated_amount: BigDecimal,
    pub actual_amount: Option<BigDecimal>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberInput {
    pub officer_id: String,
    pub role: TeamRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneInput {
    pub title: String,
    pub target_date: Option<NaiveDate>,
    pub invoice_percent: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueShareInput {
    pub officer_id: String,
    pub share_percent: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestInput {
    pub change_type: ChangeType,
    pub justification: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Everything recorded against one assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDetail {
    pub assignment: Assignment,
    pub expenditure: Vec<ExpenditureItem>,
    pub team: Vec<TeamMember>,
    pub milestones: Vec<Milestone>,
    pub revenue_shares: Vec<RevenueShare>,
    pub approval_requests: Vec<ApprovalRequest>,
}
