use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    Validation,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Operation not authorized")]
    Unauthorized,
    #[error("Resource not found")]
    NotFound,
    #[error("Resource conflict")]
    Conflict,
    #[error("Resource is not in a valid state")]
    InvalidState,
    #[error("Internal system error")]
    Internal,
}

impl ErrorCode {
    /// HTTP status the API answers with for this class of failure.
    pub const fn http_status(self) -> u16 {
        match self {
            ErrorCode::Validation => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 400,
            ErrorCode::InvalidState => 400,
            ErrorCode::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}
