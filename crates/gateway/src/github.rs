//! GitHub identity resolution.
//!
//! Exchanges the `Authorization: token <value>` header for a stable GitHub
//! identity by calling `GET /user`. A malformed header never reaches the
//! network; an upstream rejection is the one failure that tells the client to
//! drop its stored credential.

use async_trait::async_trait;
use codetutor_core::error::IdentityError;
use codetutor_core::identity::GithubUser;
use tracing::{debug, warn};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// GitHub requires a user agent on every API call.
const USER_AGENT: &str = "codetutor-auth-check";

/// Resolves a raw Authorization header to a user identity.
///
/// Trait seam so handler tests can inject a scripted resolver.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn verify(&self, auth_header: Option<&str>) -> Result<GithubUser, IdentityError>;
}

/// The production resolver backed by the GitHub REST API.
pub struct GithubResolver {
    base_url: String,
    client: reqwest::Client,
}

impl GithubResolver {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_BASE)
    }

    /// Point at a different API base (useful for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for GithubResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for GithubResolver {
    async fn verify(&self, auth_header: Option<&str>) -> Result<GithubUser, IdentityError> {
        let token = parse_token_header(auth_header)?;

        let url = format!("{}/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("token {token}"))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "GitHub rejected the token");
            return Err(IdentityError::Upstream {
                detail: format!("{status}: {body}"),
            });
        }

        let user: GithubUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        debug!(user = %user.login, "Token verified");
        Ok(user)
    }
}

/// Extract the token from an `Authorization: token <value>` header.
///
/// The header must be exactly two space-separated parts with the literal
/// scheme `token`; anything else is malformed.
fn parse_token_header(header: Option<&str>) -> Result<&str, IdentityError> {
    let header = header.ok_or(IdentityError::Malformed)?;
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("token"), Some(value), None) if !value.is_empty() => Ok(value),
        _ => Err(IdentityError::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_header_parses() {
        assert_eq!(parse_token_header(Some("token gho_abc123")).unwrap(), "gho_abc123");
    }

    #[test]
    fn missing_header_is_malformed() {
        assert!(matches!(
            parse_token_header(None),
            Err(IdentityError::Malformed)
        ));
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert!(parse_token_header(Some("Bearer gho_abc123")).is_err());
        assert!(parse_token_header(Some("Token gho_abc123")).is_err());
    }

    #[test]
    fn extra_parts_are_malformed() {
        assert!(parse_token_header(Some("token a b")).is_err());
        assert!(parse_token_header(Some("token")).is_err());
        assert!(parse_token_header(Some("token ")).is_err());
        assert!(parse_token_header(Some("")).is_err());
    }
}
