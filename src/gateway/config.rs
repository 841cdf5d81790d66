use std::env;
use std::time::Duration;

use crate::auth::{AuthError, AuthResult};

const DEFAULT_VALIDATE_URL: &str = "http://auth-service:8081/api/auth/validate";
const DEFAULT_ROUTES: &str = "/api/auth=http://auth-service:8081,\
/api/users=http://user-service:8082,\
/api/expenses=http://expense-service:8083,\
/api/categories=http://category-service:8084";
const DEFAULT_PUBLIC_PREFIXES: &str = "/api/auth/";

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

/// A downstream service reachable under a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRoute {
    pub prefix: String,
    pub target: String,
}

impl GatewayRoute {
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            target: target.into().trim_end_matches('/').to_string(),
        }
    }

    /// Prefix match on whole path segments: `/api/users` serves `/api/users`
    /// and `/api/users/7`, not `/api/usersettings`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }
}

/// Parse `prefix=url,prefix=url` route tables.
pub fn parse_routes(raw: &str) -> AuthResult<Vec<GatewayRoute>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, target) = entry.split_once('=').ok_or_else(|| {
                AuthError::Config(format!("route '{entry}' must look like prefix=url"))
            })?;
            let (prefix, target) = (prefix.trim(), target.trim());
            if !prefix.starts_with('/') || target.is_empty() {
                return Err(AuthError::Config(format!("route '{entry}' is invalid")));
            }
            Ok(GatewayRoute::new(prefix, target))
        })
        .collect()
}

/// Gateway configuration loaded from environment variables.
#[derive(Clone)]
pub struct GatewayConfig {
    pub jwt_secret: String,
    pub validate_url: String,
    pub remote_timeout: Duration,
    pub forward_timeout: Duration,
    pub routes: Vec<GatewayRoute>,
    pub public_prefixes: Vec<String>,
    pub max_body_bytes: u64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("jwt_secret", &"<redacted>")
            .field("validate_url", &self.validate_url)
            .field("remote_timeout", &self.remote_timeout)
            .field("forward_timeout", &self.forward_timeout)
            .field("routes", &self.routes)
            .field("public_prefixes", &self.public_prefixes)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = env::var("EXPENSE_JWT_SECRET")
            .map_err(|_| AuthError::Config("EXPENSE_JWT_SECRET is required".into()))?;
        let routes = parse_routes(&env_string("GATEWAY_ROUTES", DEFAULT_ROUTES))?;
        let public_prefixes = env_string("GATEWAY_PUBLIC_PREFIXES", DEFAULT_PUBLIC_PREFIXES)
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            jwt_secret,
            validate_url: env_string("GATEWAY_AUTH_VALIDATE_URL", DEFAULT_VALIDATE_URL),
            remote_timeout: env_duration_millis("GATEWAY_AUTH_TIMEOUT_MS", 2_000),
            forward_timeout: env_duration_millis("GATEWAY_FORWARD_TIMEOUT_MS", 30_000),
            routes,
            public_prefixes,
            max_body_bytes: env_u64("GATEWAY_MAX_BODY_BYTES", 2 * 1024 * 1024),
        })
    }

    /// Configuration with default timeouts and no public prefixes, for
    /// embedding the gateway in tests or other binaries.
    pub fn new(jwt_secret: impl Into<String>, validate_url: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            validate_url: validate_url.into(),
            remote_timeout: Duration::from_millis(2_000),
            forward_timeout: Duration::from_millis(30_000),
            routes: Vec::new(),
            public_prefixes: Vec::new(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_route_table() {
        let routes = parse_routes(DEFAULT_ROUTES).expect("default routes parse");
        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0], GatewayRoute::new("/api/auth", "http://auth-service:8081"));
    }

    #[test]
    fn rejects_malformed_routes() {
        assert!(parse_routes("/api/x").is_err());
        assert!(parse_routes("api/x=http://x").is_err());
        assert!(parse_routes("/api/x=").is_err());
        assert!(parse_routes("").expect("empty table").is_empty());
    }

    #[test]
    fn route_prefixes_match_whole_segments() {
        let route = GatewayRoute::new("/api/users/", "http://users/");
        assert_eq!(route.target, "http://users");
        assert!(route.matches("/api/users"));
        assert!(route.matches("/api/users/7"));
        assert!(route.matches("/api/users?page=2"));
        assert!(!route.matches("/api/usersettings"));
        assert!(!route.matches("/api"));
    }

    #[test]
    fn public_prefixes_bypass_authentication() {
        let mut config = GatewayConfig::new("s".repeat(32), "http://auth/validate");
        config.public_prefixes = vec!["/api/auth/".into()];
        assert!(config.is_public("/api/auth/login"));
        assert!(!config.is_public("/api/expenses"));
    }
}
