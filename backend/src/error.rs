use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorCode, ErrorResponse, ValidationError};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Poll not found")]
    NotFound,
    #[error("You have already voted on this poll")]
    AlreadyVoted,
    #[error("Poll is not active")]
    PollInactive,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::Validation,
            ApiError::Unauthenticated => ErrorCode::Unauthenticated,
            ApiError::Unauthorized => ErrorCode::Unauthorized,
            ApiError::NotFound => ErrorCode::NotFound,
            ApiError::AlreadyVoted => ErrorCode::Conflict,
            ApiError::PollInactive => ErrorCode::InvalidState,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.code().http_status()).unwrap_or(Status::InternalServerError)
    }

    /// Message safe to show callers. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Conflict => ApiError::AlreadyVoted,
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        if let ApiError::Internal(details) = &self {
            error!("{} {} failed: {}", req.method(), req.uri(), details);
        }

        let status = self.status();
        let body = ErrorResponse::new(self.code(), self.public_message());

        rocket::Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}
