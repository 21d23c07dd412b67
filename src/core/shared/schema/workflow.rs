diesel::table! {
    assignments (id) {
        id -> Uuid,
        assignment_no -> Varchar,
        #[sql_name = "type"]
        assignment_type -> Varchar,
        title -> Varchar,
        client -> Nullable<Varchar>,
        client_type -> Nullable<Varchar>,
        office_id -> Varchar,
        team_leader_officer_id -> Nullable<Varchar>,
        registered_by -> Varchar,
        workflow_stage -> Varchar,
        registration_status -> Varchar,
        approval_status -> Varchar,
        cost_approval_status -> Varchar,
        team_approval_status -> Varchar,
        milestone_approval_status -> Varchar,
        revenue_approval_status -> Varchar,
        status -> Varchar,
        total_value -> Numeric,
        man_days -> Nullable<Numeric>,
        is_notional -> Bool,
        tor_scope -> Nullable<Text>,
        start_date -> Nullable<Date>,
        target_date -> Nullable<Date>,
        details_filled -> Bool,
        invoice_raised_amount -> Numeric,
        payment_received_amount -> Numeric,
        physical_progress_percent -> Float8,
        timeline_progress_percent -> Float8,
        remarks -> Nullable<Text>,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    expenditure_items (id) {
        id -> Uuid,
        assignment_id -> Uuid,
        head_code -> Varchar,
        estimated_amount -> Numeric,
        actual_amount -> Numeric,
        remarks -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    assignment_team (id) {
        id -> Uuid,
        assignment_id -> Uuid,
        officer_id -> Varchar,
        role -> Varchar,
        assigned_by -> Nullable<Varchar>,
        assigned_at -> Timestamptz,
        is_active -> Bool,
    }
}

diesel::table! {
    milestones (id) {
        id -> Uuid,
        assignment_id -> Uuid,
        milestone_no -> Int4,
        title -> Varchar,
        target_date -> Nullable<Date>,
        actual_completion_date -> Nullable<Date>,
        invoice_percent -> Numeric,
        invoice_amount -> Numeric,
        invoice_raised -> Bool,
        invoice_raised_date -> Nullable<Date>,
        payment_received -> Bool,
        payment_received_date -> Nullable<Date>,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    revenue_shares (id) {
        id -> Uuid,
        assignment_id -> Uuid,
        officer_id -> Varchar,
        share_percent -> Numeric,
        share_amount -> Numeric,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    approval_requests (id) {
        id -> Uuid,
        request_type -> Varchar,
        reference_type -> Varchar,
        reference_id -> Uuid,
        requested_by -> Varchar,
        office_id -> Varchar,
        status -> Varchar,
        review_status -> Nullable<Varchar>,
        request_data -> Jsonb,
        remarks -> Nullable<Text>,
        reviewed_by -> Nullable<Varchar>,
        review_notes -> Nullable<Text>,
        approval_remarks -> Nullable<Text>,
        approved_by -> Nullable<Varchar>,
        approved_at -> Nullable<Timestamptz>,
        escalated_to -> Nullable<Varchar>,
        escalated_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
