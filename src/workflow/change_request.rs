//! Change requests against approved assignment data.
//!
//! A request is raised by any officer, reviewed by the assignment's team
//! leader (forward or reject) and decided by a head. Approval sends the
//! affected section back to DRAFT so it can be edited and resubmitted.

use chrono::Utc;
use log::info;
use uuid::Uuid;

use super::service::{log_activity, required_text, WorkflowService, ASSIGNMENT_ENTITY};
use super::types::{ApprovalRequest, Assignment, ChangeRequestInput};
use crate::authz::Actor;
use crate::core::shared::enums::{
    ApprovalRequestType, Permission, RequestStatus, ReviewStatus, SectionStatus, WorkflowStage,
};
use crate::error::WorkflowError;
use crate::storage::{StoreTx, TxResult};

pub(crate) const REQUEST_ENTITY: &str = "APPROVAL_REQUEST";

fn require_change_request(request: &ApprovalRequest) -> TxResult<()> {
    if request.request_type != ApprovalRequestType::ChangeRequest {
        return Err(WorkflowError::InvalidState(format!(
            "request {} is a {} request",
            request.id, request.request_type
        )));
    }
    Ok(())
}

fn require_review_status(request: &ApprovalRequest, expected: ReviewStatus) -> TxResult<()> {
    if request.status != RequestStatus::Pending || request.review_status != Some(expected) {
        return Err(WorkflowError::InvalidState(format!(
            "request {} is {} (review {})",
            request.id,
            request.status,
            request
                .review_status
                .map_or_else(|| "none".to_string(), |s| s.to_string())
        )));
    }
    Ok(())
}

/// Locks the assignment a request refers to and then the request itself.
/// Registration decisions lock in the same order, so the two never wait on
/// each other in a cycle.
pub(crate) fn lock_request_and_assignment(
    tx: &mut dyn StoreTx,
    request_id: Uuid,
) -> TxResult<(ApprovalRequest, Assignment)> {
    let reference_id = tx
        .find_approval_request(request_id)?
        .ok_or_else(|| {
            WorkflowError::NotFound(format!("approval request {} not found", request_id))
        })?
        .reference_id;
    let assignment = tx.lock_assignment(reference_id)?;
    let request = tx.lock_approval_request(request_id)?;
    Ok((request, assignment))
}

impl WorkflowService {
    pub fn submit_change_request(
        &self,
        assignment_id: Uuid,
        input: ChangeRequestInput,
        actor: &Actor,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.authz.require_permission(actor, Permission::RaiseRequest)?;
        let justification = required_text(Some(input.justification), "justification")?;

        let request = self.store.transaction(|tx| {
            let assignment = tx.lock_assignment(assignment_id)?;
            if !matches!(
                assignment.workflow_stage,
                WorkflowStage::DetailEntry | WorkflowStage::Active
            ) {
                return Err(WorkflowError::InvalidState(format!(
                    "change requests are not accepted in stage {}",
                    assignment.workflow_stage
                )));
            }
            let now = Utc::now();
            let request = ApprovalRequest {
                id: Uuid::new_v4(),
                request_type: ApprovalRequestType::ChangeRequest,
                reference_type: ASSIGNMENT_ENTITY.to_string(),
                reference_id: assignment.id,
                requested_by: actor.officer_id.clone(),
                office_id: assignment.office_id.clone(),
                status: RequestStatus::Pending,
                review_status: Some(ReviewStatus::Pending),
                request_data: serde_json::json!({
                    "change_type": input.change_type,
                    "justification": justification,
                    "details": input.details,
                }),
                remarks: Some(justification.clone()),
                reviewed_by: None,
                review_notes: None,
                approval_remarks: None,
                approved_by: None,
                approved_at: None,
                escalated_to: None,
                escalated_at: None,
                created_at: now,
                updated_at: now,
            };
            tx.insert_approval_request(&request)?;
            log_activity(
                tx,
                actor,
                "CHANGE_REQUEST_SUBMITTED",
                REQUEST_ENTITY,
                request.id,
                Some(input.change_type.to_string()),
            )?;
            Ok(request)
        })?;
        info!(
            "Change request {} raised on assignment {} by {}",
            request.id, assignment_id, actor.officer_id
        );
        Ok(request)
    }

    /// Team leader review; forwards the request to the head.
    pub fn forward_change_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.review_change_request(request_id, actor, true, notes)
    }

    pub fn review_reject_change_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        notes: String,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let notes = required_text(Some(notes), "review notes")?;
        self.review_change_request(request_id, actor, false, Some(notes))
    }

    fn review_change_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        forward: bool,
        notes: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.store.transaction(|tx| {
            let (mut request, assignment) = lock_request_and_assignment(tx, request_id)?;
            require_change_request(&request)?;
            if !assignment.is_led_by(&actor.officer_id) {
                log::warn!(
                    "Permission denied: {} reviewed change request {} without leading {}",
                    actor.officer_id,
                    request.id,
                    assignment.assignment_no
                );
                return Err(WorkflowError::PermissionDenied(
                    "only the assignment's team leader can review change requests".to_string(),
                ));
            }
            require_review_status(&request, ReviewStatus::Pending)?;

            if forward {
                request.review_status = Some(ReviewStatus::Forwarded);
            } else {
                request.review_status = Some(ReviewStatus::Rejected);
                request.status = RequestStatus::Rejected;
            }
            request.reviewed_by = Some(actor.officer_id.clone());
            request.review_notes = notes.clone();
            request.updated_at = Utc::now();
            tx.update_approval_request(&request)?;
            log_activity(
                tx,
                actor,
                if forward {
                    "CHANGE_REQUEST_FORWARDED"
                } else {
                    "CHANGE_REQUEST_REVIEW_REJECTED"
                },
                REQUEST_ENTITY,
                request.id,
                notes,
            )?;
            Ok(request)
        })
    }

    pub fn head_approve_change_request(
        &self,
        request_id: Uuid,
        approver: &Actor,
        remarks: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.head_decide_change_request(request_id, true, approver, remarks)
    }

    pub fn head_reject_change_request(
        &self,
        request_id: Uuid,
        approver: &Actor,
        remarks: String,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let remarks = required_text(Some(remarks), "remarks")?;
        self.head_decide_change_request(request_id, false, approver, Some(remarks))
    }

    fn head_decide_change_request(
        &self,
        request_id: Uuid,
        approve: bool,
        approver: &Actor,
        remarks: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.authz
            .require_permission(approver, Permission::ApproveAssignment)?;
        self.store.transaction(|tx| {
            let (mut request, mut assignment) = lock_request_and_assignment(tx, request_id)?;
            require_change_request(&request)?;
            self.require_head_in_scope(tx, approver, &assignment.office_id)?;
            require_review_status(&request, ReviewStatus::Forwarded)?;
            apply_change_decision(tx, &mut request, &mut assignment, approve, approver, remarks)?;
            Ok(request)
        })
    }
}

/// Settles a change request. On approval the affected section returns to
/// DRAFT. Authority and request state are checked by the caller.
pub(crate) fn apply_change_decision(
    tx: &mut dyn StoreTx,
    request: &mut ApprovalRequest,
    assignment: &mut Assignment,
    approve: bool,
    actor: &Actor,
    remarks: Option<String>,
) -> TxResult<()> {
    let now = Utc::now();
    if approve {
        let change_type = request.change_type().ok_or_else(|| {
            WorkflowError::InvalidState(format!("request {} has no change type", request.id))
        })?;
        let section = change_type.section();
        assignment.sections.set(section, SectionStatus::Draft);
        assignment.touch();
        tx.update_assignment(assignment)?;
        info!(
            "Change request {} approved, section {} of {} reopened",
            request.id, section, assignment.assignment_no
        );
        request.status = RequestStatus::Approved;
        request.review_status = Some(ReviewStatus::Approved);
    } else {
        request.status = RequestStatus::Rejected;
        request.review_status = Some(ReviewStatus::Rejected);
    }
    request.approved_by = Some(actor.officer_id.clone());
    request.approved_at = Some(now);
    request.approval_remarks = remarks.clone();
    request.updated_at = now;
    tx.update_approval_request(request)?;
    log_activity(
        tx,
        actor,
        if approve {
            "CHANGE_REQUEST_APPROVED"
        } else {
            "CHANGE_REQUEST_REJECTED"
        },
        REQUEST_ENTITY,
        request.id,
        remarks,
    )
}
