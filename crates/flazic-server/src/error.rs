use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;

/// Error taxonomy shared by every handler. Each variant maps to exactly one
/// status code; handlers return `Result<_, ApiError>` and let `?` do the rest.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input; rejected before any persistence
    Validation(String),
    NotFound(&'static str),
    /// Uniqueness violation; the caller must resubmit with corrected data
    Conflict(String),
    Forbidden(&'static str),
    Unauthenticated(&'static str),
    /// Unexpected persistence failure; the enclosing transaction is rolled back
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Validation(m) | ApiError::Conflict(m) => m,
            ApiError::NotFound(m) | ApiError::Forbidden(m) | ApiError::Unauthenticated(m) => m,
            ApiError::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<DbErr> for ApiError {
    fn from(e: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
            tracing::debug!("unique constraint violation: {detail}");
            return ApiError::Conflict("Already exists".to_string());
        }
        tracing::error!("db error: {e}");
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Unauthenticated("who").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_hides_detail() {
        assert_eq!(ApiError::Internal.message(), "Internal server error");
    }

    #[test]
    fn test_db_error_maps_to_internal() {
        let err = ApiError::from(DbErr::Custom("boom".into()));
        assert!(matches!(err, ApiError::Internal));
    }
}
