diesel::table! {
    officers (officer_id) {
        officer_id -> Varchar,
        name -> Varchar,
        office_id -> Varchar,
        is_active -> Bool,
    }
}

diesel::table! {
    officer_roles (id) {
        id -> Uuid,
        officer_id -> Varchar,
        role_type -> Varchar,
        scope_type -> Varchar,
        scope_value -> Nullable<Varchar>,
        is_primary -> Bool,
        effective_from -> Date,
        effective_to -> Nullable<Date>,
    }
}

diesel::table! {
    reporting_hierarchy (id) {
        id -> Uuid,
        entity_type -> Varchar,
        entity_value -> Varchar,
        group_code -> Nullable<Varchar>,
        reports_to_role -> Varchar,
        effective_from -> Date,
        effective_to -> Nullable<Date>,
    }
}

diesel::table! {
    document_sequences (sequence_key) {
        sequence_key -> Varchar,
        last_value -> Int8,
    }
}

diesel::table! {
    activity_log (id) {
        id -> Uuid,
        actor_id -> Varchar,
        action -> Varchar,
        entity_type -> Varchar,
        entity_id -> Uuid,
        remarks -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}
