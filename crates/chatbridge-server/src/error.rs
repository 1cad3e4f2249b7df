use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chatbridge_core::BridgeError;
use chatbridge_types::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request_error",
            ApiError::BackendUnavailable(_) => "backend_unavailable",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::InvalidRequest(msg) => ApiError::InvalidRequest(msg),
            BridgeError::BackendUnavailable(msg) => ApiError::BackendUnavailable(msg),
            BridgeError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Json(ErrorBody::new(self.to_string(), self.error_type()));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
