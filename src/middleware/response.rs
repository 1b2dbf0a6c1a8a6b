use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Success envelope builder: every body starts as `{ "status": "success" }`
/// and handlers attach `results`, `data` and `token` keys as needed.
#[derive(Debug)]
pub struct ApiResponse {
    status_code: StatusCode,
    body: Map<String, Value>,
    serialize_error: bool,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// 201 Created
    pub fn created() -> Self {
        Self::with_status(StatusCode::CREATED)
    }

    /// 204 No Content (no body is sent)
    pub fn no_content() -> Self {
        Self::with_status(StatusCode::NO_CONTENT)
    }

    pub fn with_status(status_code: StatusCode) -> Self {
        let mut body = Map::new();
        body.insert("status".to_string(), Value::String("success".to_string()));
        Self {
            status_code,
            body,
            serialize_error: false,
        }
    }

    /// Attach `"data": { key: value }`.
    pub fn data(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(key.to_string(), value);
                self.body.insert("data".to_string(), Value::Object(data));
            }
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                self.serialize_error = true;
            }
        }
        self
    }

    /// Attach a pre-shaped `"data"` value. The report endpoints return bare
    /// arrays here instead of keyed objects.
    pub fn data_value(mut self, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body.insert("data".to_string(), value);
            }
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                self.serialize_error = true;
            }
        }
        self
    }

    /// Attach the list envelope's `"results"` count.
    pub fn results(mut self, count: usize) -> Self {
        self.body.insert("results".to_string(), json!(count));
        self
    }

    /// Attach a signed JWT as `"token"`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.body
            .insert("token".to_string(), Value::String(token.into()));
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        if self.serialize_error {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Something went very wrong!"
                })),
            )
                .into_response();
        }

        // For 204 No Content, return empty response
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }

        (self.status_code, Json(Value::Object(self.body))).into_response()
    }
}

// Convenience type alias for handler signatures
pub type ApiResult = Result<ApiResponse, crate::error::ApiError>;
