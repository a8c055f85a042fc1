use crate::error::ApiError;
use uuid::Uuid;

/// Poll ids that cannot exist are reported the same way as missing polls.
pub fn parse_poll_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound)
}
