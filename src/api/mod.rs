pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/assignments", post(handle_register_assignment))
        .route("/api/assignments/:id", get(handle_get_assignment))
        .route("/api/assignments/:id/progress", get(handle_get_progress))
        .route("/api/assignments/:id/revenue", get(handle_assignment_revenue))
        .route(
            "/api/assignments/:id/registration/approve",
            post(handle_approve_registration),
        )
        .route(
            "/api/assignments/:id/registration/reject",
            post(handle_reject_registration),
        )
        .route(
            "/api/assignments/:id/team-leader",
            post(handle_allocate_team_leader),
        )
        .route("/api/assignments/:id/details", put(handle_update_details))
        .route(
            "/api/assignments/:id/expenditure",
            put(handle_save_expenditure),
        )
        .route("/api/assignments/:id/team", put(handle_save_team))
        .route(
            "/api/assignments/:id/milestones",
            put(handle_save_milestones),
        )
        .route(
            "/api/assignments/:id/revenue-shares",
            put(handle_save_revenue_shares),
        )
        .route(
            "/api/assignments/:id/sections/:section/submit",
            post(handle_submit_section),
        )
        .route(
            "/api/assignments/:id/sections/:section/approve",
            post(handle_approve_section),
        )
        .route(
            "/api/assignments/:id/sections/:section/reject",
            post(handle_reject_section),
        )
        .route(
            "/api/assignments/:id/complete",
            post(handle_complete_assignment),
        )
        .route(
            "/api/assignments/:id/change-requests",
            post(handle_submit_change_request),
        )
        .route(
            "/api/assignments/:id/invoices",
            get(handle_list_invoices).post(handle_raise_invoice),
        )
        .route(
            "/api/change-requests/:id/forward",
            post(handle_forward_change_request),
        )
        .route(
            "/api/change-requests/:id/review-reject",
            post(handle_review_reject_change_request),
        )
        .route(
            "/api/change-requests/:id/approve",
            post(handle_approve_change_request),
        )
        .route(
            "/api/change-requests/:id/reject",
            post(handle_reject_change_request),
        )
        .route(
            "/api/approval-requests/:id/escalate",
            post(handle_escalate_request),
        )
        .route(
            "/api/approval-requests/:id/resolve",
            post(handle_resolve_escalated),
        )
        .route("/api/invoices/:id/approve", post(handle_approve_invoice))
        .route("/api/invoices/:id/reject", post(handle_reject_invoice))
        .route("/api/invoices/:id/payments", post(handle_record_payment))
        .route(
            "/api/officers/:officer_id/revenue",
            get(handle_officer_revenue),
        )
        .route("/api/officers/:officer_id/roles", get(handle_officer_roles))
}
