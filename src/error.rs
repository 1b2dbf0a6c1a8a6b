// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::query::QueryError;

/// HTTP API error rendered as a `{ "status": ..., "message": ... }` envelope.
/// Client errors (4xx) carry status `"fail"`, server errors (5xx) `"error"`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }

    /// Envelope status label for this error class
    pub fn status(&self) -> &'static str {
        if self.status_code() < 500 {
            "fail"
        } else {
            "error"
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status(),
            "message": self.message(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

// Convert other error types to ApiError
impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(err: crate::auth::TokenError) -> Self {
        match err {
            crate::auth::TokenError::Generation(_) => {
                tracing::error!("Token signing error: {}", err);
                ApiError::internal("Something went very wrong!")
            }
            _ => ApiError::unauthorized(err.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal("Something went very wrong!")
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // Unique and foreign-key violations are the client's fault; the
            // Postgres message ("duplicate key value violates ...") is safe
            // to surface.
            match db.code().as_deref() {
                Some("23505") | Some("23503") => {
                    return ApiError::bad_request(db.message().to_string());
                }
                _ => {}
            }
        }
        tracing::error!("Database error: {}", err);
        ApiError::internal("Something went very wrong!")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_report_fail() {
        let err = ApiError::not_found("No tour found with that ID");
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            err.to_json(),
            json!({ "status": "fail", "message": "No tour found with that ID" })
        );
    }

    #[test]
    fn server_errors_report_error() {
        let err = ApiError::internal("Something went very wrong!");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_json()["status"], "error");
    }

    #[test]
    fn query_errors_become_bad_requests() {
        let err: ApiError = QueryError::InvalidSortField("password".to_string()).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Invalid sort field: password");
    }
}
