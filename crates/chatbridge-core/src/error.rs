use chatbridge_client::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// OpenAI-style error type string.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::BackendUnavailable(_) => "backend_unavailable",
            BridgeError::InvalidRequest(_) => "invalid_request_error",
            BridgeError::Internal(_) => "internal_error",
        }
    }
}

impl From<ClientError> for BridgeError {
    fn from(error: ClientError) -> Self {
        BridgeError::BackendUnavailable(error.to_string())
    }
}
