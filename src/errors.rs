use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors the HTTP adapter can hit before it even reaches the authorization
/// core — a malformed subrequest from the proxy, essentially. Failures from
/// inside the core never surface here; they arrive as `Decision::internal_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::MissingHeader(name) => (
                StatusCode::BAD_REQUEST,
                "missing_header",
                format!("missing required header: {name}"),
            ),
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
