pub mod directory;
pub mod ledger;
pub mod workflow;

pub use self::directory::*;
pub use self::ledger::*;
pub use self::workflow::*;

diesel::joinable!(officer_roles -> officers (officer_id));
diesel::joinable!(expenditure_items -> assignments (assignment_id));
diesel::joinable!(assignment_team -> assignments (assignment_id));
diesel::joinable!(milestones -> assignments (assignment_id));
diesel::joinable!(revenue_shares -> assignments (assignment_id));
diesel::joinable!(invoice_requests -> assignments (assignment_id));
diesel::joinable!(payment_receipts -> invoice_requests (invoice_request_id));
diesel::joinable!(officer_revenue_ledger -> assignments (assignment_id));

diesel::allow_tables_to_appear_in_same_query!(
    officers,
    officer_roles,
    reporting_hierarchy,
    document_sequences,
    assignments,
    expenditure_items,
    assignment_team,
    milestones,
    revenue_shares,
    approval_requests,
    invoice_requests,
    payment_receipts,
    officer_revenue_ledger,
    activity_log,
);
