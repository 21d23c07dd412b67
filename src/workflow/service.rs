use bigdecimal::BigDecimal;
use chrono::Utc;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::guards::{check_submission, next_stage, reset_on_edit, share_total, SectionEvidence};
use super::numbering::{assignment_number, assignment_sequence_key, financial_year};
use super::types::*;
use crate::authz::{Actor, AuthorizationEngine, ReportingHierarchy};
use crate::core::config::WorkflowConfig;
use crate::core::shared::enums::{
    ApprovalRequestType, AssignmentType, MilestoneStatus, OperationalStatus, Permission,
    RegistrationStatus, RequestStatus, Section, SectionStatus, TeamRole, WorkflowStage,
};
use crate::core::shared::utils::round_amount;
use crate::error::WorkflowError;
use crate::progress::{self, ProgressReport};
use crate::storage::{effective_today, Store, StoreTx, TxResult};

pub(crate) const ASSIGNMENT_ENTITY: &str = "ASSIGNMENT";

/// Drives an assignment from registration to completion.
#[derive(Clone)]
pub struct WorkflowService {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) authz: Arc<AuthorizationEngine>,
    pub(crate) config: WorkflowConfig,
}

pub(crate) fn load_hierarchy(tx: &mut dyn StoreTx) -> TxResult<ReportingHierarchy> {
    let entries = tx.hierarchy_entries()?;
    Ok(ReportingHierarchy::from_entries(&entries, effective_today()))
}

pub(crate) fn log_activity(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    action: &str,
    entity_type: &str,
    entity_id: Uuid,
    remarks: Option<String>,
) -> TxResult<()> {
    tx.log_activity(
        &ActivityRecord::new(&actor.officer_id, action, entity_type, entity_id).with_remarks(remarks),
    )
}

pub(crate) fn require_detail_stage(assignment: &Assignment) -> Result<(), WorkflowError> {
    match assignment.workflow_stage {
        WorkflowStage::DetailEntry | WorkflowStage::Active => Ok(()),
        stage => Err(WorkflowError::InvalidState(format!(
            "assignment {} is in stage {}",
            assignment.assignment_no, stage
        ))),
    }
}

pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, WorkflowError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WorkflowError::Validation(format!("{} is required", field)))
}

pub(crate) fn percent_of(total: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    round_amount(&(total * percent / BigDecimal::from(100)))
}

/// Permission a team leader needs to fill in a section.
fn fill_permission(section: Section) -> Permission {
    match section {
        Section::Basic | Section::Cost | Section::Revenue => Permission::FillAssignmentDetails,
        Section::Team => Permission::SetTeam,
        Section::Milestone => Permission::FillMilestoneDetails,
    }
}

fn section_permission(section: Section) -> Permission {
    match section {
        Section::Basic | Section::Cost | Section::Team => Permission::ApproveAssignment,
        Section::Milestone => Permission::ApproveMilestone,
        Section::Revenue => Permission::ApproveRevenueShare,
    }
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn Store>,
        authz: Arc<AuthorizationEngine>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            authz,
            config,
        }
    }

    pub fn resolve_actor(&self, officer_id: &str) -> Result<Actor, WorkflowError> {
        self.store
            .transaction(|tx| self.authz.resolve_actor(tx, officer_id, effective_today()))
    }

    /// Team leader of the assignment holding the section's fill permission,
    /// or a head acting inside its scope.
    pub(crate) fn require_editor(
        &self,
        tx: &mut dyn StoreTx,
        actor: &Actor,
        assignment: &Assignment,
        section: Section,
    ) -> TxResult<()> {
        if assignment.is_led_by(&actor.officer_id) {
            return self.authz.require_permission(actor, fill_permission(section));
        }
        self.require_head_in_scope(tx, actor, &assignment.office_id)
    }

    pub(crate) fn require_head_in_scope(
        &self,
        tx: &mut dyn StoreTx,
        actor: &Actor,
        office_id: &str,
    ) -> TxResult<()> {
        if !actor.is_head_or_above() {
            log::warn!(
                "Permission denied: officer {} is neither team leader nor head for office {}",
                actor.officer_id,
                office_id
            );
            return Err(WorkflowError::PermissionDenied(
                "team leader or head of the office required".to_string(),
            ));
        }
        let hierarchy = load_hierarchy(tx)?;
        self.authz.require_scope(actor, office_id, &hierarchy)
    }

    pub fn register(
        &self,
        request: RegisterAssignmentRequest,
        actor: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(actor, Permission::RegisterAssignment)?;

        let title = required_text(request.title, "title")?;
        let kind: AssignmentType = required_text(request.assignment_type, "type")?.parse()?;
        let office_id = request
            .office_id
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| actor.office_id.clone());
        if office_id.is_empty() {
            return Err(WorkflowError::Validation("office is required".to_string()));
        }

        let zero = BigDecimal::from(0);
        let (total_value, man_days, is_notional) = match kind {
            AssignmentType::Development => {
                let days = request.man_days.ok_or_else(|| {
                    WorkflowError::Validation("man_days is required for DEVELOPMENT".to_string())
                })?;
                if days < zero {
                    return Err(WorkflowError::Validation(
                        "man_days cannot be negative".to_string(),
                    ));
                }
                let value = round_amount(&(&days * &self.config.development_unit_rate));
                (value, Some(days), true)
            }
            _ => {
                let value = request.total_value.unwrap_or_else(|| zero.clone());
                if value < zero {
                    return Err(WorkflowError::Validation(
                        "total_value cannot be negative".to_string(),
                    ));
                }
                (value, request.man_days, false)
            }
        };

        let fy = financial_year(Utc::now().date_naive());
        let assignment = self.store.transaction(|tx| {
            let sequence = tx.next_sequence(&assignment_sequence_key(&office_id, &fy))?;
            let now = Utc::now();
            let assignment = Assignment {
                id: Uuid::new_v4(),
                assignment_no: assignment_number(
                    &self.config.org_prefix,
                    &office_id,
                    kind,
                    sequence,
                    &fy,
                ),
                assignment_type: kind,
                title,
                client: request.client,
                client_type: request.client_type,
                office_id: office_id.clone(),
                team_leader_officer_id: None,
                registered_by: actor.officer_id.clone(),
                workflow_stage: WorkflowStage::Registration,
                registration_status: RegistrationStatus::PendingApproval,
                sections: SectionStatuses::default(),
                status: OperationalStatus::Pipeline,
                total_value,
                man_days,
                is_notional,
                tor_scope: request.tor_scope,
                start_date: None,
                target_date: None,
                details_filled: false,
                invoice_raised_amount: zero.clone(),
                payment_received_amount: zero.clone(),
                physical_progress_percent: 0.0,
                timeline_progress_percent: 0.0,
                remarks: None,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            tx.insert_assignment(&assignment)?;

            tx.insert_approval_request(&ApprovalRequest {
                id: Uuid::new_v4(),
                request_type: ApprovalRequestType::Registration,
                reference_type: ASSIGNMENT_ENTITY.to_string(),
                reference_id: assignment.id,
                requested_by: actor.officer_id.clone(),
                office_id: office_id.clone(),
                status: RequestStatus::Pending,
                review_status: None,
                request_data: serde_json::json!({
                    "assignment_no": assignment.assignment_no,
                    "title": assignment.title,
                    "type": assignment.assignment_type,
                }),
                remarks: None,
                reviewed_by: None,
                review_notes: None,
                approval_remarks: None,
                approved_by: None,
                approved_at: None,
                escalated_to: None,
                escalated_at: None,
                created_at: now,
                updated_at: now,
            })?;
            log_activity(tx, actor, "REGISTER", ASSIGNMENT_ENTITY, assignment.id, None)?;
            Ok(assignment)
        })?;

        info!(
            "Registered assignment {} for office {} by {}",
            assignment.assignment_no, assignment.office_id, actor.officer_id
        );
        Ok(assignment)
    }

    pub fn approve_registration(
        &self,
        assignment_id: Uuid,
        approver: &Actor,
        remarks: Option<String>,
    ) -> Result<Assignment, WorkflowError> {
        self.decide_registration(assignment_id, true, approver, remarks)
    }

    pub fn reject_registration(
        &self,
        assignment_id: Uuid,
        approver: &Actor,
        remarks: String,
    ) -> Result<Assignment, WorkflowError> {
        let remarks = required_text(Some(remarks), "remarks")?;
        self.decide_registration(assignment_id, false, approver, Some(remarks))
    }

    fn decide_registration(
        &self,
        assignment_id: Uuid,
        approve: bool,
        approver: &Actor,
        remarks: Option<String>,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(approver, Permission::ApproveAssignment)?;
        let assignment = self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            self.require_head_in_scope(tx, approver, &assignment.office_id)?;
            apply_registration_decision(tx, &mut assignment, approve, approver, remarks)?;
            Ok(assignment)
        })?;
        info!(
            "Registration of {} {} by {}",
            assignment.assignment_no,
            if approve { "approved" } else { "rejected" },
            approver.officer_id
        );
        Ok(assignment)
    }

    pub fn allocate_team_leader(
        &self,
        assignment_id: Uuid,
        leader_officer_id: &str,
        approver: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(approver, Permission::AllocateTeamLeader)?;
        let assignment = self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            self.require_head_in_scope(tx, approver, &assignment.office_id)?;
            if assignment.workflow_stage != WorkflowStage::TlAssignment {
                return Err(WorkflowError::InvalidState(format!(
                    "team leader can only be allocated in TL_ASSIGNMENT, assignment is {}",
                    assignment.workflow_stage
                )));
            }
            match tx.officer(leader_officer_id)? {
                Some(officer) if officer.is_active => {}
                _ => {
                    return Err(WorkflowError::Validation(format!(
                        "officer {} is not an active officer",
                        leader_officer_id
                    )))
                }
            }

            let now = Utc::now();
            let mut team: Vec<TeamMember> = tx
                .team_members(assignment.id)?
                .into_iter()
                .filter(|m| m.officer_id != leader_officer_id)
                .map(|mut m| {
                    if m.role == TeamRole::TeamLeader {
                        m.role = TeamRole::Member;
                    }
                    m
                })
                .collect();
            team.insert(
                0,
                TeamMember {
                    id: Uuid::new_v4(),
                    assignment_id: assignment.id,
                    officer_id: leader_officer_id.to_string(),
                    role: TeamRole::TeamLeader,
                    assigned_by: Some(approver.officer_id.clone()),
                    assigned_at: now,
                    is_active: true,
                },
            );
            tx.replace_team_members(assignment.id, &team)?;

            assignment.team_leader_officer_id = Some(leader_officer_id.to_string());
            assignment.workflow_stage = WorkflowStage::DetailEntry;
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                approver,
                "ALLOCATE_TEAM_LEADER",
                ASSIGNMENT_ENTITY,
                assignment.id,
                Some(leader_officer_id.to_string()),
            )?;
            Ok(assignment)
        })?;
        info!(
            "Team leader {} allocated to {}",
            leader_officer_id, assignment.assignment_no
        );
        Ok(assignment)
    }

    /// Shared path for every edit of section data: lock, check stage and
    /// editor, apply, then send an approved section back for approval.
    fn edit_section<T>(
        &self,
        assignment_id: Uuid,
        section: Section,
        actor: &Actor,
        action: &str,
        apply: impl FnOnce(&mut dyn StoreTx, &mut Assignment) -> TxResult<T>,
    ) -> Result<(T, Assignment), WorkflowError> {
        self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            require_detail_stage(&assignment)?;
            self.require_editor(tx, actor, &assignment, section)?;
            let out = apply(tx, &mut assignment)?;
            if reset_on_edit(&mut assignment.sections, section) {
                info!(
                    "Section {} of {} returned to SUBMITTED after edit",
                    section, assignment.assignment_no
                );
            }
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                actor,
                action,
                ASSIGNMENT_ENTITY,
                assignment.id,
                Some(section.to_string()),
            )?;
            Ok((out, assignment))
        })
    }

    pub fn update_basic_details(
        &self,
        assignment_id: Uuid,
        update: BasicDetailsUpdate,
        actor: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        if let (Some(start), Some(target)) = (update.start_date, update.target_date) {
            if start > target {
                return Err(WorkflowError::Validation(
                    "start_date cannot be after target_date".to_string(),
                ));
            }
        }
        let rate = self.config.development_unit_rate.clone();
        self.edit_section(
            assignment_id,
            Section::Basic,
            actor,
            "UPDATE_BASIC_DETAILS",
            move |_, assignment| {
                if let Some(title) = update.title {
                    assignment.title = required_text(Some(title), "title")?;
                }
                if update.client.is_some() {
                    assignment.client = update.client;
                }
                if update.client_type.is_some() {
                    assignment.client_type = update.client_type;
                }
                if update.tor_scope.is_some() {
                    assignment.tor_scope = update.tor_scope;
                }
                if update.start_date.is_some() {
                    assignment.start_date = update.start_date;
                }
                if update.target_date.is_some() {
                    assignment.target_date = update.target_date;
                }
                if update.remarks.is_some() {
                    assignment.remarks = update.remarks;
                }

                let zero = BigDecimal::from(0);
                if assignment.assignment_type == AssignmentType::Development {
                    if update.total_value.is_some() {
                        return Err(WorkflowError::Validation(
                            "DEVELOPMENT value is derived from man_days".to_string(),
                        ));
                    }
                    if let Some(days) = update.man_days {
                        if days < zero {
                            return Err(WorkflowError::Validation(
                                "man_days cannot be negative".to_string(),
                            ));
                        }
                        assignment.total_value = round_amount(&(&days * &rate));
                        assignment.man_days = Some(days);
                    }
                } else {
                    if let Some(value) = update.total_value {
                        if value < zero {
                            return Err(WorkflowError::Validation(
                                "total_value cannot be negative".to_string(),
                            ));
                        }
                        assignment.total_value = value;
                    }
                    if update.man_days.is_some() {
                        assignment.man_days = update.man_days;
                    }
                }

                if let (Some(start), Some(target)) = (assignment.start_date, assignment.target_date)
                {
                    if start > target {
                        return Err(WorkflowError::Validation(
                            "start_date cannot be after target_date".to_string(),
                        ));
                    }
                }
                assignment.details_filled = assignment
                    .client
                    .as_deref()
                    .map_or(false, |c| !c.trim().is_empty())
                    && assignment.start_date.is_some()
                    && assignment.target_date.is_some();
                Ok(())
            },
        )
        .map(|(_, assignment)| assignment)
    }

    pub fn save_expenditure(
        &self,
        assignment_id: Uuid,
        items: Vec<ExpenditureInput>,
        actor: &Actor,
    ) -> Result<Vec<ExpenditureItem>, WorkflowError> {
        let zero = BigDecimal::from(0);
        for item in &items {
            if item.head_code.trim().is_empty() {
                return Err(WorkflowError::Validation("head_code is required".to_string()));
            }
            if item.estimated_amount < zero || item.actual_amount.as_ref().map_or(false, |a| *a < zero)
            {
                return Err(WorkflowError::Validation(format!(
                    "amounts for {} cannot be negative",
                    item.head_code
                )));
            }
        }
        self.edit_section(
            assignment_id,
            Section::Cost,
            actor,
            "SAVE_EXPENDITURE",
            move |tx, assignment| {
                let now = Utc::now();
                let rows: Vec<ExpenditureItem> = items
                    .into_iter()
                    .map(|item| ExpenditureItem {
                        id: Uuid::new_v4(),
                        assignment_id: assignment.id,
                        head_code: item.head_code.trim().to_string(),
                        estimated_amount: item.estimated_amount,
                        actual_amount: item.actual_amount.unwrap_or_else(|| BigDecimal::from(0)),
                        remarks: item.remarks,
                        created_at: now,
                    })
                    .collect();
                tx.replace_expenditure_items(assignment.id, &rows)?;
                Ok(rows)
            },
        )
        .map(|(rows, _)| rows)
    }

    pub fn save_team(
        &self,
        assignment_id: Uuid,
        members: Vec<TeamMemberInput>,
        actor: &Actor,
    ) -> Result<Vec<TeamMember>, WorkflowError> {
        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.officer_id.as_str()) {
                return Err(WorkflowError::Validation(format!(
                    "officer {} listed twice",
                    member.officer_id
                )));
            }
        }
        let assigned_by = actor.officer_id.clone();
        self.edit_section(
            assignment_id,
            Section::Team,
            actor,
            "SAVE_TEAM",
            move |tx, assignment| {
                let leader = assignment.team_leader_officer_id.clone();
                if let Some(leader) = &leader {
                    if !members.iter().any(|m| &m.officer_id == leader) {
                        return Err(WorkflowError::Validation(format!(
                            "team leader {} must remain on the team",
                            leader
                        )));
                    }
                }
                let now = Utc::now();
                let mut rows = Vec::with_capacity(members.len());
                for member in members {
                    match tx.officer(&member.officer_id)? {
                        Some(officer) if officer.is_active => {}
                        _ => {
                            return Err(WorkflowError::Validation(format!(
                                "officer {} is not an active officer",
                                member.officer_id
                            )))
                        }
                    }
                    let is_leader = leader.as_deref() == Some(member.officer_id.as_str());
                    if member.role == TeamRole::TeamLeader && !is_leader {
                        return Err(WorkflowError::Validation(format!(
                            "{} is not the allocated team leader",
                            member.officer_id
                        )));
                    }
                    rows.push(TeamMember {
                        id: Uuid::new_v4(),
                        assignment_id: assignment.id,
                        role: if is_leader {
                            TeamRole::TeamLeader
                        } else {
                            member.role
                        },
                        officer_id: member.officer_id,
                        assigned_by: Some(assigned_by.clone()),
                        assigned_at: now,
                        is_active: true,
                    });
                }
                tx.replace_team_members(assignment.id, &rows)?;
                Ok(rows)
            },
        )
        .map(|(rows, _)| rows)
    }

    pub fn save_milestones(
        &self,
        assignment_id: Uuid,
        milestones: Vec<MilestoneInput>,
        actor: &Actor,
    ) -> Result<Vec<Milestone>, WorkflowError> {
        let zero = BigDecimal::from(0);
        let hundred = BigDecimal::from(100);
        for m in &milestones {
            if m.title.trim().is_empty() {
                return Err(WorkflowError::Validation("milestone title is required".to_string()));
            }
            if m.invoice_percent < zero || m.invoice_percent > hundred {
                return Err(WorkflowError::Validation(format!(
                    "invoice_percent of '{}' must be between 0 and 100",
                    m.title
                )));
            }
        }
        self.edit_section(
            assignment_id,
            Section::Milestone,
            actor,
            "SAVE_MILESTONES",
            move |tx, assignment| {
                if tx.milestones(assignment.id)?.iter().any(|m| m.invoice_raised) {
                    return Err(WorkflowError::InvalidState(
                        "milestones with raised invoices cannot be replaced".to_string(),
                    ));
                }
                if tx
                    .invoice_requests_for(assignment.id)?
                    .iter()
                    .any(|i| i.milestone_id.is_some())
                {
                    return Err(WorkflowError::InvalidState(
                        "milestones referenced by invoice requests cannot be replaced".to_string(),
                    ));
                }
                let now = Utc::now();
                let rows: Vec<Milestone> = milestones
                    .into_iter()
                    .enumerate()
                    .map(|(idx, m)| Milestone {
                        id: Uuid::new_v4(),
                        assignment_id: assignment.id,
                        milestone_no: idx as i32 + 1,
                        title: m.title.trim().to_string(),
                        target_date: m.target_date,
                        actual_completion_date: None,
                        invoice_amount: percent_of(&assignment.total_value, &m.invoice_percent),
                        invoice_percent: m.invoice_percent,
                        invoice_raised: false,
                        invoice_raised_date: None,
                        payment_received: false,
                        payment_received_date: None,
                        status: MilestoneStatus::Pending,
                        created_at: now,
                        updated_at: now,
                    })
                    .collect();
                tx.replace_milestones(assignment.id, &rows)?;
                Ok(rows)
            },
        )
        .map(|(rows, _)| rows)
    }

    pub fn save_revenue_shares(
        &self,
        assignment_id: Uuid,
        shares: Vec<RevenueShareInput>,
        actor: &Actor,
    ) -> Result<Vec<RevenueShare>, WorkflowError> {
        let zero = BigDecimal::from(0);
        let hundred = BigDecimal::from(100);
        let mut seen = HashSet::new();
        for share in &shares {
            if !seen.insert(share.officer_id.as_str()) {
                return Err(WorkflowError::Validation(format!(
                    "officer {} listed twice",
                    share.officer_id
                )));
            }
            if share.share_percent < zero || share.share_percent > hundred {
                return Err(WorkflowError::Validation(format!(
                    "share of {} must be between 0 and 100",
                    share.officer_id
                )));
            }
        }
        self.edit_section(
            assignment_id,
            Section::Revenue,
            actor,
            "SAVE_REVENUE_SHARES",
            move |tx, assignment| {
                let now = Utc::now();
                let mut rows = Vec::with_capacity(shares.len());
                for share in shares {
                    if tx.officer(&share.officer_id)?.is_none() {
                        return Err(WorkflowError::Validation(format!(
                            "officer {} is not known",
                            share.officer_id
                        )));
                    }
                    rows.push(RevenueShare {
                        id: Uuid::new_v4(),
                        assignment_id: assignment.id,
                        share_amount: percent_of(&assignment.total_value, &share.share_percent),
                        officer_id: share.officer_id,
                        share_percent: share.share_percent,
                        created_at: now,
                        updated_at: now,
                    });
                }
                tx.replace_revenue_shares(assignment.id, &rows)?;
                Ok(rows)
            },
        )
        .map(|(rows, _)| rows)
    }

    fn section_evidence(
        &self,
        tx: &mut dyn StoreTx,
        assignment: &Assignment,
        section: Section,
    ) -> TxResult<SectionEvidence> {
        let mut evidence = SectionEvidence {
            details_filled: assignment.details_filled,
            ..Default::default()
        };
        match section {
            Section::Basic => {}
            Section::Cost => evidence.expenditure_items = tx.expenditure_items(assignment.id)?.len(),
            Section::Team => {
                evidence.active_team_members = tx
                    .team_members(assignment.id)?
                    .iter()
                    .filter(|m| m.is_active)
                    .count()
            }
            Section::Milestone => evidence.milestones = tx.milestones(assignment.id)?.len(),
            Section::Revenue => {
                let shares = tx.revenue_shares(assignment.id)?;
                evidence.share_count = shares.len();
                evidence.share_total = share_total(shares.iter().map(|s| &s.share_percent));
            }
        }
        Ok(evidence)
    }

    pub fn submit_section(
        &self,
        assignment_id: Uuid,
        section: Section,
        actor: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            require_detail_stage(&assignment)?;
            self.require_editor(tx, actor, &assignment, section)?;

            match assignment.sections.get(section) {
                SectionStatus::Submitted => return Ok(assignment),
                SectionStatus::Approved => {
                    return Err(WorkflowError::InvalidState(format!(
                        "section {} is already approved",
                        section
                    )))
                }
                SectionStatus::Draft | SectionStatus::Rejected => {}
            }

            let evidence = self.section_evidence(tx, &assignment, section)?;
            check_submission(section, &evidence, &self.config.share_tolerance)?;

            assignment.sections.set(section, SectionStatus::Submitted);
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                actor,
                "SUBMIT_SECTION",
                ASSIGNMENT_ENTITY,
                assignment.id,
                Some(section.to_string()),
            )?;
            info!("Section {} of {} submitted", section, assignment.assignment_no);
            Ok(assignment)
        })
    }

    pub fn approve_section(
        &self,
        assignment_id: Uuid,
        section: Section,
        approver: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(approver, section_permission(section))?;
        self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            self.require_head_in_scope(tx, approver, &assignment.office_id)?;
            require_detail_stage(&assignment)?;

            match assignment.sections.get(section) {
                SectionStatus::Approved => return Ok(assignment),
                SectionStatus::Submitted => {}
                status => {
                    return Err(WorkflowError::InvalidState(format!(
                        "section {} is {}, not SUBMITTED",
                        section, status
                    )))
                }
            }

            // Data may have been edited since submission.
            let evidence = self.section_evidence(tx, &assignment, section)?;
            check_submission(section, &evidence, &self.config.share_tolerance)?;

            assignment.sections.set(section, SectionStatus::Approved);
            log_activity(
                tx,
                approver,
                "APPROVE_SECTION",
                ASSIGNMENT_ENTITY,
                assignment.id,
                Some(section.to_string()),
            )?;

            let stage = next_stage(assignment.workflow_stage, &assignment.sections);
            if stage != assignment.workflow_stage {
                assignment.workflow_stage = stage;
                assignment.status = OperationalStatus::Ongoing;
                log_activity(tx, approver, "ACTIVATE", ASSIGNMENT_ENTITY, assignment.id, None)?;
                info!("Assignment {} is now ACTIVE", assignment.assignment_no);
            }
            assignment.touch();
            tx.update_assignment(&assignment)?;
            Ok(assignment)
        })
    }

    pub fn reject_section(
        &self,
        assignment_id: Uuid,
        section: Section,
        approver: &Actor,
        remarks: String,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(approver, section_permission(section))?;
        let remarks = required_text(Some(remarks), "remarks")?;
        self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            self.require_head_in_scope(tx, approver, &assignment.office_id)?;
            require_detail_stage(&assignment)?;
            if assignment.sections.get(section) != SectionStatus::Submitted {
                return Err(WorkflowError::InvalidState(format!(
                    "section {} is not awaiting approval",
                    section
                )));
            }
            assignment.sections.set(section, SectionStatus::Draft);
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                approver,
                "REJECT_SECTION",
                ASSIGNMENT_ENTITY,
                assignment.id,
                Some(format!("{}: {}", section, remarks)),
            )?;
            Ok(assignment)
        })
    }

    pub fn complete_assignment(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
    ) -> Result<Assignment, WorkflowError> {
        self.authz
            .require_permission(actor, Permission::ApproveAssignment)?;
        self.store.transaction(|tx| {
            let mut assignment = tx.lock_assignment(assignment_id)?;
            self.require_head_in_scope(tx, actor, &assignment.office_id)?;
            if assignment.workflow_stage != WorkflowStage::Active {
                return Err(WorkflowError::InvalidState(format!(
                    "only ACTIVE assignments can be completed, {} is {}",
                    assignment.assignment_no, assignment.workflow_stage
                )));
            }
            assignment.workflow_stage = WorkflowStage::Completed;
            assignment.status = OperationalStatus::Completed;
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(tx, actor, "COMPLETE", ASSIGNMENT_ENTITY, assignment.id, None)?;
            Ok(assignment)
        })
    }

    pub fn assignment_detail(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
    ) -> Result<AssignmentDetail, WorkflowError> {
        self.authz.require_permission(actor, Permission::ViewAllMis)?;
        self.store.transaction(|tx| {
            let assignment = tx
                .find_assignment(assignment_id)?
                .ok_or_else(|| WorkflowError::NotFound(format!("assignment {}", assignment_id)))?;
            Ok(AssignmentDetail {
                expenditure: tx.expenditure_items(assignment.id)?,
                team: tx.team_members(assignment.id)?,
                milestones: tx.milestones(assignment.id)?,
                revenue_shares: tx.revenue_shares(assignment.id)?,
                approval_requests: tx.approval_requests_for(assignment.id)?,
                assignment,
            })
        })
    }

    /// Progress computed from current milestone data, as of today.
    pub fn assignment_progress(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
    ) -> Result<ProgressReport, WorkflowError> {
        self.authz.require_permission(actor, Permission::ViewAllMis)?;
        self.store.transaction(|tx| {
            if tx.find_assignment(assignment_id)?.is_none() {
                return Err(WorkflowError::NotFound(format!("assignment {}", assignment_id)));
            }
            let milestones = tx.milestones(assignment_id)?;
            Ok(progress::report(&milestones, Utc::now().date_naive()))
        })
    }
}

/// Applies a registration decision to a locked assignment and settles its
/// open registration request. Authority is checked by the caller.
pub(crate) fn apply_registration_decision(
    tx: &mut dyn StoreTx,
    assignment: &mut Assignment,
    approve: bool,
    actor: &Actor,
    remarks: Option<String>,
) -> TxResult<()> {
    if assignment.workflow_stage != WorkflowStage::Registration
        || assignment.registration_status != RegistrationStatus::PendingApproval
    {
        return Err(WorkflowError::InvalidState(format!(
            "registration of {} is {}",
            assignment.assignment_no, assignment.registration_status
        )));
    }

    if approve {
        assignment.registration_status = RegistrationStatus::Approved;
        assignment.workflow_stage = WorkflowStage::TlAssignment;
        assignment.status = OperationalStatus::NotStarted;
    } else {
        assignment.registration_status = RegistrationStatus::Rejected;
        assignment.remarks = remarks.clone();
    }
    assignment.touch();
    tx.update_assignment(assignment)?;

    let now = Utc::now();
    let open: Vec<ApprovalRequest> = tx
        .approval_requests_for(assignment.id)?
        .into_iter()
        .filter(|r| {
            r.request_type == ApprovalRequestType::Registration
                && matches!(r.status, RequestStatus::Pending | RequestStatus::Escalated)
        })
        .collect();
    for request in open {
        let mut request = tx.lock_approval_request(request.id)?;
        request.status = if approve {
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };
        request.approved_by = Some(actor.officer_id.clone());
        request.approved_at = Some(now);
        request.approval_remarks = remarks.clone();
        request.updated_at = now;
        tx.update_approval_request(&request)?;
    }

    log_activity(
        tx,
        actor,
        if approve {
            "APPROVE_REGISTRATION"
        } else {
            "REJECT_REGISTRATION"
        },
        ASSIGNMENT_ENTITY,
        assignment.id,
        remarks,
    )
}
