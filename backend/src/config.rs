use tracing::warn;

pub const JWT_SECRET_KEY: &str = "SUPABASE_JWT_SECRET";
pub const CORS_ORIGIN_KEY: &str = "CORS_ALLOWED_ORIGIN";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HMAC secret the auth provider signs session tokens with.
    pub jwt_secret: Option<String>,
    /// Exact origins (scheme, host and port) that get CORS headers.
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

impl Config {
    /// Builds the config from any key/value source, e.g. the Shuttle secret store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let jwt_secret = lookup(JWT_SECRET_KEY).filter(|s| !s.trim().is_empty());
        if jwt_secret.is_none() {
            warn!("{} not found - all requests will be treated as anonymous", JWT_SECRET_KEY);
        }

        let mut cors_origins: Vec<String> = lookup(CORS_ORIGIN_KEY)
            .unwrap_or_default()
            .split(',')
            .map(normalize_origin)
            .filter(|origin| !origin.is_empty())
            .collect();
        if cors_origins.is_empty() {
            cors_origins.push(DEFAULT_CORS_ORIGIN.to_string());
        }

        Self { jwt_secret, cors_origins }
    }
}

/// Browsers send origins without a trailing slash; hosts compare case-insensitively.
pub fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_empty() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn blank_secret_is_ignored() {
        let config = Config::from_lookup(lookup(&[(JWT_SECRET_KEY, "   ")]));
        assert_eq!(config.jwt_secret, None);
    }

    #[test]
    fn reads_values() {
        let config = Config::from_lookup(lookup(&[
            (JWT_SECRET_KEY, "s3cret"),
            (CORS_ORIGIN_KEY, "https://polly.example"),
        ]));
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.cors_origins, vec!["https://polly.example"]);
    }

    #[test]
    fn reads_origin_list() {
        let config = Config::from_lookup(lookup(&[(
            CORS_ORIGIN_KEY,
            " https://polly.example/ , HTTP://localhost:3000,,",
        )]));
        assert_eq!(config.cors_origins, vec!["https://polly.example", "http://localhost:3000"]);
    }
}
