use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::ApiError, routes::AppState};

pub const SESSION_COOKIE: &str = "sb-access-token";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session verification is not configured")]
    Disabled,
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("subject is not a user id")]
    InvalidSubject,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => SessionError::BadSignature,
            ErrorKind::InvalidAlgorithm => SessionError::UnsupportedAlgorithm,
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Malformed,
        }
    }
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
}

/// The signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Checks HS256 session tokens issued by the hosted auth service.
pub struct SessionVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl Default for SessionVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionVerifier {
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // the auth service sets `aud` to a role name, not to this API
        validation.validate_aud = false;
        Self { key: None, validation }
    }

    pub fn new_with_secret(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if secret.trim().is_empty() {
            warn!("SessionVerifier created with empty secret - authentication will be disabled");
            return Self::new();
        }
        Self {
            key: Some(DecodingKey::from_secret(secret.as_bytes())),
            ..Self::new()
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, SessionError> {
        let key = self.key.as_ref().ok_or(SessionError::Disabled)?;
        let claims = decode::<Claims>(token, key, &self.validation)?.claims;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| SessionError::InvalidSubject)?;
        Ok(AuthUser { id })
    }
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .or_else(|| req.cookies().get(SESSION_COOKIE).map(|cookie| cookie.value()))
        .filter(|token| !token.is_empty())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("application state not mounted".into()),
            ));
        };

        let Some(token) = bearer_token(req) else {
            return Outcome::Error((Status::Unauthorized, ApiError::Unauthenticated));
        };

        match state.sessions.verify(token) {
            Ok(user) => Outcome::Success(user),
            Err(e) => {
                debug!("Rejected session token: {}", e);
                Outcome::Error((Status::Unauthorized, ApiError::Unauthenticated))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn issue_token(secret: &str, sub: &str, exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = serde_json::json!({ "sub": sub, "exp": exp, "aud": "authenticated", "role": "authenticated" });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).expect("token encodes")
}
