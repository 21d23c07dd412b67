use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use super::change_request::{
    apply_change_decision, lock_request_and_assignment, REQUEST_ENTITY,
};
use super::service::{apply_registration_decision, load_hierarchy, log_activity, WorkflowService};
use super::types::ApprovalRequest;
use crate::authz::Actor;
use crate::core::shared::enums::{
    ApprovalRequestType, Permission, RequestStatus, ReviewStatus, RoleType,
};
use crate::error::WorkflowError;

impl WorkflowService {
    /// Hands a pending request to the DDG responsible for its office.
    ///
    /// Change requests are escalated from the head stage, so they must have
    /// been forwarded by the team leader first.
    pub fn escalate_request(
        &self,
        request_id: Uuid,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let request = self.store.transaction(|tx| {
            let mut request = tx.lock_approval_request(request_id)?;
            if request.status != RequestStatus::Pending {
                return Err(WorkflowError::InvalidState(format!(
                    "only pending requests can be escalated, request {} is {}",
                    request.id, request.status
                )));
            }
            if request.request_type == ApprovalRequestType::ChangeRequest
                && request.review_status != Some(ReviewStatus::Forwarded)
            {
                return Err(WorkflowError::InvalidState(
                    "change request has not been forwarded by the team leader".to_string(),
                ));
            }

            let hierarchy = load_hierarchy(tx)?;
            let may_escalate = self
                .authz
                .has_permission(&actor.roles, Permission::ApproveEscalated)
                || (actor.is_head_or_above()
                    && self
                        .authz
                        .can_act_in_scope(&actor.roles, &request.office_id, &hierarchy));
            if !may_escalate {
                warn!(
                    "Permission denied: {} cannot escalate request {}",
                    actor.officer_id, request.id
                );
                return Err(WorkflowError::PermissionDenied(
                    "no authority to escalate this request".to_string(),
                ));
            }

            let ddg = hierarchy.responsible_ddg(&request.office_id).ok_or_else(|| {
                WorkflowError::InvalidState(format!(
                    "no DDG is responsible for office {}",
                    request.office_id
                ))
            })?;

            let now = Utc::now();
            request.status = RequestStatus::Escalated;
            request.escalated_to = Some(ddg.to_string());
            request.escalated_at = Some(now);
            if remarks.is_some() {
                request.remarks = remarks.clone();
            }
            request.updated_at = now;
            tx.update_approval_request(&request)?;
            log_activity(tx, actor, "ESCALATE", REQUEST_ENTITY, request.id, remarks)?;
            Ok(request)
        })?;
        info!(
            "Request {} escalated to {}",
            request.id,
            request.escalated_to.as_deref().unwrap_or("-")
        );
        Ok(request)
    }

    /// Decision on an escalated request by the DDG it was escalated to, or by
    /// the DG or an administrator.
    pub fn resolve_escalated(
        &self,
        request_id: Uuid,
        approve: bool,
        actor: &Actor,
        remarks: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        self.authz
            .require_permission(actor, Permission::ApproveEscalated)?;
        self.store.transaction(|tx| {
            let (mut request, mut assignment) = lock_request_and_assignment(tx, request_id)?;
            if request.status != RequestStatus::Escalated {
                return Err(WorkflowError::InvalidState(format!(
                    "request {} is not escalated",
                    request.id
                )));
            }

            let target = request
                .escalated_to
                .as_deref()
                .and_then(|role| role.parse::<RoleType>().ok());
            let authorised = actor.holds(RoleType::Admin)
                || actor.holds(RoleType::Dg)
                || target.map_or(false, |role| actor.holds(role));
            if !authorised {
                warn!(
                    "Permission denied: {} is not the escalation target of request {}",
                    actor.officer_id, request.id
                );
                return Err(WorkflowError::PermissionDenied(format!(
                    "request is escalated to {}",
                    request.escalated_to.as_deref().unwrap_or("-")
                )));
            }

            match request.request_type {
                ApprovalRequestType::Registration => {
                    apply_registration_decision(tx, &mut assignment, approve, actor, remarks)?;
                    tx.lock_approval_request(request.id)
                }
                ApprovalRequestType::ChangeRequest => {
                    apply_change_decision(
                        tx,
                        &mut request,
                        &mut assignment,
                        approve,
                        actor,
                        remarks,
                    )?;
                    Ok(request)
                }
            }
        })
    }
}
