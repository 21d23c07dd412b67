use axum::{response::IntoResponse, Json};
use diesel::result::DatabaseErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Incomplete section: {0}")]
    IncompleteSection(String),
    #[error("Inconsistent revenue shares: {0}")]
    InconsistentShare(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::PermissionDenied(_) => "permission_denied",
            Self::InvalidState(_) => "invalid_state",
            Self::IncompleteSection(_) => "incomplete_section",
            Self::InconsistentShare(_) => "inconsistent_share",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<diesel::result::Error> for WorkflowError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound("record not found".to_string()),
            // Unique indexes back the one-receipt-per-invoice and one-allocation-per-source rules.
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::InvalidState(format!("duplicate record: {}", info.message()))
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for WorkflowError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::IncompleteSection(_) | Self::InconsistentShare(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: WorkflowError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn test_status_codes() {
        use axum::http::StatusCode;
        let cases = [
            (WorkflowError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (WorkflowError::InvalidState("x".into()), StatusCode::CONFLICT),
            (
                WorkflowError::IncompleteSection("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (WorkflowError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                WorkflowError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
