//! HTTP mapping of core errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use wayfarer_core::Error as CoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Core(err) => match err {
                CoreError::MalformedEnvelope(_) | CoreError::Serialization(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
                CoreError::Discovery { .. }
                | CoreError::RemoteUnavailable { .. }
                | CoreError::RemoteProtocol { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
