use rocket::Request;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::{AuthError, AuthResult};

pub const AUTHORIZATION_HEADER: &str = "Authorization";
const BEARER_SCHEME: &str = "Bearer";

/// Split an `Authorization` header value into its bearer token.
///
/// Returns `None` when the header is absent, uses another scheme, or carries an
/// empty token.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// The bearer token presented on a request, if any. Never fails as a guard so
/// handlers can answer with a JSON error body instead of Rocket's catcher.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct BearerToken(Option<String>);

impl BearerToken {
    pub fn into_token(self) -> AuthResult<String> {
        self.0.ok_or(AuthError::Unauthorized)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let header = request.headers().get_one(AUTHORIZATION_HEADER);
        Outcome::Success(BearerToken(bearer_token(header).map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer garbage")), Some("garbage"));
    }

    #[test]
    fn refuses_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(None), None);
        assert_eq!(bearer_token(Some("")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Bearer   ")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(Some("Bearerabc")), None);
    }
}
