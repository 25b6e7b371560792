use oauth2::TokenResponse;
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Persisted token material for one user's GitHub authorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl OAuthToken {
    /// Builds a token record from a completed authorization-code exchange.
    #[must_use]
    pub fn from_response(response: &BasicTokenResponse) -> Self {
        let now = OffsetDateTime::now_utc();
        let token_type = match response.token_type() {
            BasicTokenType::Bearer => "bearer".to_owned(),
            BasicTokenType::Mac => "mac".to_owned(),
            other => format!("{other:?}").to_lowercase(),
        };
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            token_type,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")),
            expires_at: response.expires_in().map(|ttl| now + ttl),
            created_at: now,
        }
    }

    /// A plain bearer token with no refresh material, as issued for
    /// non-expiring GitHub OAuth apps.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "bearer".to_owned(),
            scope: None,
            expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at < OffsetDateTime::now_utc())
    }
}

/// Provider-side error delivered to the OAuth callback (`error`,
/// `error_description`, `error_uri` query parameters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationError {
    pub error: String,
    pub description: Option<String>,
    pub uri: Option<String>,
}

impl std::fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({description})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}
