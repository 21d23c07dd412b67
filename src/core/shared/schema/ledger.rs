diesel::table! {
    invoice_requests (id) {
        id -> Uuid,
        request_number -> Varchar,
        assignment_id -> Uuid,
        milestone_id -> Nullable<Uuid>,
        invoice_type -> Varchar,
        invoice_amount -> Numeric,
        fy_period -> Varchar,
        description -> Nullable<Text>,
        status -> Varchar,
        requested_by -> Varchar,
        approved_by -> Nullable<Varchar>,
        approved_at -> Nullable<Timestamptz>,
        approval_remarks -> Nullable<Text>,
        revenue_recognized_80 -> Numeric,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    payment_receipts (id) {
        id -> Uuid,
        receipt_number -> Varchar,
        invoice_request_id -> Uuid,
        amount_received -> Numeric,
        receipt_date -> Date,
        payment_mode -> Varchar,
        reference_number -> Nullable<Varchar>,
        fy_period -> Varchar,
        remarks -> Nullable<Text>,
        revenue_recognized_20 -> Numeric,
        updated_by -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    officer_revenue_ledger (id) {
        id -> Uuid,
        officer_id -> Varchar,
        assignment_id -> Uuid,
        invoice_request_id -> Nullable<Uuid>,
        payment_receipt_id -> Nullable<Uuid>,
        source_id -> Uuid,
        revenue_type -> Varchar,
        share_percent -> Numeric,
        amount -> Numeric,
        fy_period -> Varchar,
        transaction_date -> Date,
        remarks -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}
