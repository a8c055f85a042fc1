use serde::{Serialize, Deserialize};
use uuid::Uuid;

pub const UNKNOWN_IP: &str = "unknown";

/// Who a vote is attributed to. A signed-in user always wins over the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VoterIdentity {
    User(Uuid),
    Ip(String),
}

impl VoterIdentity {
    pub fn resolve(user_id: Option<Uuid>, client_ip: ClientIp) -> Self {
        match user_id {
            Some(id) => VoterIdentity::User(id),
            None => VoterIdentity::Ip(client_ip.0),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            VoterIdentity::User(id) => Some(*id),
            VoterIdentity::Ip(_) => None,
        }
    }

    pub fn ip(&self) -> Option<&str> {
        match self {
            VoterIdentity::User(_) => None,
            VoterIdentity::Ip(ip) => Some(ip),
        }
    }
}

/// Best-effort client address taken from proxy headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_headers(forwarded_for: Option<&str>, real_ip: Option<&str>) -> Self {
        let forwarded = forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        let ip = forwarded
            .or_else(|| real_ip.map(str::trim).filter(|ip| !ip.is_empty()))
            .unwrap_or(UNKNOWN_IP);

        ClientIp(ip.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IP
    }
}

// Backend-specific Rocket implementation
#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for ClientIp {
        type Error = std::convert::Infallible;

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            let headers = req.headers();
            Outcome::Success(ClientIp::from_headers(
                headers.get_one("X-Forwarded-For"),
                headers.get_one("X-Real-IP"),
            ))
        }
    }
}
