use rocket::{Request, catch, serde::json::Json};
use shared::{ErrorCode, ErrorResponse};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::Validation, "Invalid request body"))
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::Unauthenticated, "Authentication required"))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorResponse> {
    let error = match req.uri().path().segments().get(1) {
        Some("polls") => "Poll not found",
        _ => "The requested resource was not found.",
    };
    Json(ErrorResponse::new(ErrorCode::NotFound, error))
}

#[catch(422)]
pub fn unprocessable_entity(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::Validation, "Invalid request body"))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(ErrorCode::Internal, "Internal server error"))
}
