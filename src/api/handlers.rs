use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::authz::{Actor, ResolvedRole};
use crate::core::shared::enums::{Permission, Section};
use crate::core::shared::state::AppState;
use crate::error::WorkflowError;
use crate::ledger::{
    AssignmentRevenueSummary, InvoiceApproval, InvoiceRequest, InvoiceRequestInput,
    OfficerRevenueSummary, PaymentInput, PaymentRecording,
};
use crate::progress::ProgressReport;
use crate::storage::effective_today;
use crate::workflow::numbering::financial_year;
use crate::workflow::types::*;

/// Header carrying the authenticated officer, set by the fronting gateway.
pub const OFFICER_HEADER: &str = "x-officer-id";

#[derive(Debug, Default, Deserialize)]
pub struct RemarksBody {
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamLeaderBody {
    pub officer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub approve: bool,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub fy: Option<String>,
}

fn officer_from_headers(headers: &HeaderMap) -> Result<String, WorkflowError> {
    headers
        .get(OFFICER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            WorkflowError::PermissionDenied(format!("missing {} header", OFFICER_HEADER))
        })
}

/// Resolves the caller and runs `work` on the blocking pool.
async fn run_as<T, F>(
    state: Arc<AppState>,
    headers: &HeaderMap,
    work: F,
) -> Result<Json<T>, WorkflowError>
where
    T: Send + 'static,
    F: FnOnce(&AppState, &Actor) -> Result<T, WorkflowError> + Send + 'static,
{
    let officer_id = officer_from_headers(headers)?;
    let result = tokio::task::spawn_blocking(move || {
        let actor = state.workflow.resolve_actor(&officer_id)?;
        work(&state, &actor)
    })
    .await
    .map_err(|e: tokio::task::JoinError| WorkflowError::Internal(e.to_string()))??;
    Ok(Json(result))
}

pub async fn handle_health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "pmsflow",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============================================================================
// REGISTRATION
// ============================================================================

pub async fn handle_register_assignment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterAssignmentRequest>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| s.workflow.register(req, actor)).await
}

pub async fn handle_approve_registration(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.approve_registration(id, actor, body.remarks)
    })
    .await
}

pub async fn handle_reject_registration(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow
            .reject_registration(id, actor, body.remarks.unwrap_or_default())
    })
    .await
}

pub async fn handle_allocate_team_leader(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<TeamLeaderBody>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.allocate_team_leader(id, &body.officer_id, actor)
    })
    .await
}

// ============================================================================
// SECTION DATA
// ============================================================================

pub async fn handle_update_details(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<BasicDetailsUpdate>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.update_basic_details(id, update, actor)
    })
    .await
}

pub async fn handle_save_expenditure(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(items): Json<Vec<ExpenditureInput>>,
) -> Result<Json<Vec<ExpenditureItem>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.save_expenditure(id, items, actor)
    })
    .await
}

pub async fn handle_save_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(members): Json<Vec<TeamMemberInput>>,
) -> Result<Json<Vec<TeamMember>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.save_team(id, members, actor)
    })
    .await
}

pub async fn handle_save_milestones(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(milestones): Json<Vec<MilestoneInput>>,
) -> Result<Json<Vec<Milestone>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.save_milestones(id, milestones, actor)
    })
    .await
}

pub async fn handle_save_revenue_shares(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(shares): Json<Vec<RevenueShareInput>>,
) -> Result<Json<Vec<RevenueShare>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.save_revenue_shares(id, shares, actor)
    })
    .await
}

pub async fn handle_submit_section(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, section)): Path<(Uuid, Section)>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.submit_section(id, section, actor)
    })
    .await
}

pub async fn handle_approve_section(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, section)): Path<(Uuid, Section)>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.approve_section(id, section, actor)
    })
    .await
}

pub async fn handle_reject_section(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, section)): Path<(Uuid, Section)>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow
            .reject_section(id, section, actor, body.remarks.unwrap_or_default())
    })
    .await
}

pub async fn handle_complete_assignment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.complete_assignment(id, actor)
    })
    .await
}

pub async fn handle_get_assignment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentDetail>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.assignment_detail(id, actor)
    })
    .await
}

pub async fn handle_get_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressReport>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.assignment_progress(id, actor)
    })
    .await
}

// ============================================================================
// CHANGE REQUESTS AND ESCALATION
// ============================================================================

pub async fn handle_submit_change_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<ChangeRequestInput>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.submit_change_request(id, input, actor)
    })
    .await
}

pub async fn handle_forward_change_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.forward_change_request(id, actor, body.remarks)
    })
    .await
}

pub async fn handle_review_reject_change_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow
            .review_reject_change_request(id, actor, body.remarks.unwrap_or_default())
    })
    .await
}

pub async fn handle_approve_change_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.head_approve_change_request(id, actor, body.remarks)
    })
    .await
}

pub async fn handle_reject_change_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow
            .head_reject_change_request(id, actor, body.remarks.unwrap_or_default())
    })
    .await
}

pub async fn handle_escalate_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow.escalate_request(id, actor, body.remarks)
    })
    .await
}

pub async fn handle_resolve_escalated(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<ApprovalRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.workflow
            .resolve_escalated(id, body.approve, actor, body.remarks)
    })
    .await
}

// ============================================================================
// INVOICES, PAYMENTS AND REVENUE
// ============================================================================

pub async fn handle_raise_invoice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<InvoiceRequestInput>,
) -> Result<Json<InvoiceRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger.raise_invoice_request(id, input, actor)
    })
    .await
}

pub async fn handle_list_invoices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceRequest>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger.invoice_requests(id, actor)
    })
    .await
}

pub async fn handle_approve_invoice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<InvoiceApproval>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger.approve_invoice(id, actor, body.remarks)
    })
    .await
}

pub async fn handle_reject_invoice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarksBody>,
) -> Result<Json<InvoiceRequest>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger
            .reject_invoice(id, actor, body.remarks.unwrap_or_default())
    })
    .await
}

pub async fn handle_record_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<PaymentInput>,
) -> Result<Json<PaymentRecording>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger.record_payment(id, input, actor)
    })
    .await
}

pub async fn handle_assignment_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentRevenueSummary>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        s.ledger.assignment_revenue_summary(id, actor)
    })
    .await
}

pub async fn handle_officer_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(officer_id): Path<String>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<OfficerRevenueSummary>, WorkflowError> {
    let fy = query
        .fy
        .unwrap_or_else(|| financial_year(Utc::now().date_naive()));
    run_as(state, &headers, move |s, actor| {
        s.ledger.officer_revenue_summary(&officer_id, &fy, actor)
    })
    .await
}

pub async fn handle_officer_roles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(officer_id): Path<String>,
) -> Result<Json<Vec<ResolvedRole>>, WorkflowError> {
    run_as(state, &headers, move |s, actor| {
        if actor.officer_id != officer_id {
            s.authz.require_permission(actor, Permission::ViewAllMis)?;
        }
        s.store
            .transaction(|tx| s.authz.resolve_roles(tx, &officer_id, effective_today()))
    })
    .await
}
