use crate::config::GithubConfig;
use crate::domain::token::{AuthorizationError, OAuthToken};
use crate::error::{AppError, Result};
use crate::storage::TokenStore;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RequestTokenError, Scope,
    TokenUrl,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Observer for provider-side authorization errors, registered on the
/// service at construction and invoked synchronously.
pub trait AuthErrorObserver: Send + Sync {
    /// Called whenever GitHub reports an authorization error.
    /// Implementations must not panic; there is nobody above to catch.
    fn on_authorization_error(&self, error: &AuthorizationError);
}

/// Default observer: emits a user-facing warning through the tracing
/// pipeline for the embedding app to surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorObserver;

impl AuthErrorObserver for TracingErrorObserver {
    fn on_authorization_error(&self, error: &AuthorizationError) {
        tracing::warn!(error = %error, "OAuth error from GitHub");
    }
}

/// The authorization-code flow: hands out authorization URLs, exchanges
/// callback codes for tokens, and persists tokens keyed by user.
#[derive(Clone)]
pub struct OAuthService {
    config: GithubConfig,
    http: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
    observer: Arc<dyn AuthErrorObserver>,
}

impl std::fmt::Debug for OAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthService").field("client_id", &self.config.client_id).finish_non_exhaustive()
    }
}

impl OAuthService {
    /// # Errors
    /// Returns `AppError::Http` if the exchange HTTP client cannot be built.
    pub fn new(
        config: GithubConfig,
        tokens: Arc<dyn TokenStore>,
        observer: Arc<dyn AuthErrorObserver>,
    ) -> Result<Self> {
        // Redirects are disabled to prevent authorization-code interception.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, http, tokens, observer })
    }

    /// The URL to send the user to, plus the CSRF state the embedding app
    /// must verify on callback.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if a configured endpoint URL is
    /// invalid.
    pub fn authorization_url(&self) -> Result<(Url, CsrfToken)> {
        let scopes = self.config.scope.split(',').map(|s| Scope::new(s.trim().to_owned()));
        let (url, state) = self.oauth_client()?.authorize_url(CsrfToken::new_random).add_scopes(scopes).url();
        Ok((url, state))
    }

    /// Exchanges a callback code for a token and persists it for the user.
    ///
    /// A provider-side rejection is reported to the registered observer
    /// before the call fails with `AppError::TokenExchange`.
    #[tracing::instrument(skip(self, code), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn finish_authorization(&self, user_id: Uuid, code: String) -> Result<OAuthToken> {
        let exchange = self
            .oauth_client()?
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await;

        let response = match exchange {
            Ok(response) => response,
            Err(err) => {
                if let RequestTokenError::ServerResponse(server) = &err {
                    let provider_error = AuthorizationError {
                        error: server.error().to_string(),
                        description: server.error_description().cloned(),
                        uri: server.error_uri().cloned(),
                    };
                    self.handle_provider_error(&provider_error);
                }
                return Err(AppError::TokenExchange(err.to_string()));
            }
        };

        let token = OAuthToken::from_response(&response);
        self.tokens.save(user_id, &token).await?;
        tracing::info!("authorization completed");
        Ok(token)
    }

    /// Records a provider-side authorization error and notifies the
    /// registered observer. Called by the embedding app when the callback
    /// carries `error` parameters instead of a code. Never fails.
    pub fn handle_provider_error(&self, error: &AuthorizationError) {
        tracing::error!(
            error = %error.error,
            error_description = error.description.as_deref(),
            error_uri = error.uri.as_deref(),
            "OAuth authorization error from GitHub"
        );
        self.observer.on_authorization_error(error);
    }

    /// Drops the user's stored token, e.g. after the user revokes the app's
    /// access on the provider side.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the store rejects the delete.
    #[tracing::instrument(skip(self), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn discard_token(&self, user_id: Uuid) -> Result<()> {
        self.tokens.delete(user_id).await
    }

    // The oauth2 crate's endpoint typestate makes the configured client
    // awkward to hold in a struct field, so it is rebuilt per call.
    fn oauth_client(
        &self,
    ) -> Result<
        oauth2::Client<
            oauth2::basic::BasicErrorResponse,
            oauth2::basic::BasicTokenResponse,
            oauth2::basic::BasicTokenIntrospectionResponse,
            oauth2::StandardRevocableToken,
            oauth2::basic::BasicRevocationErrorResponse,
            oauth2::EndpointSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointNotSet,
            oauth2::EndpointSet,
        >,
    > {
        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(self.config.authorize_url.clone())
                    .map_err(|e| AppError::BadRequest(format!("invalid authorize URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(self.config.token_url.clone())
                    .map_err(|e| AppError::BadRequest(format!("invalid token URL: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.config.redirect_url.clone())
                    .map_err(|e| AppError::BadRequest(format!("invalid redirect URL: {e}")))?,
            );
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryTokenStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingObserver {
        seen: AtomicUsize,
    }

    impl AuthErrorObserver for CountingObserver {
        fn on_authorization_error(&self, _error: &AuthorizationError) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_config() -> GithubConfig {
        GithubConfig {
            client_id: "test-client".to_owned(),
            client_secret: "test-secret".to_owned(),
            scope: "read:org,user:email".to_owned(),
            org: "bandstand".to_owned(),
            members_team_id: 1,
            roadies_team_id: 2,
            admin_access_token: "admin-token".to_owned(),
            api_base_url: "https://api.github.test/".to_owned(),
            authorize_url: "https://github.test/login/oauth/authorize".to_owned(),
            token_url: "https://github.test/login/oauth/access_token".to_owned(),
            redirect_url: "https://bandstand.test/callback".to_owned(),
            roadies_org: "bandstand-roadies".to_owned(),
            roadies_help_repo: "help".to_owned(),
            request_timeout_secs: 5,
        }
    }

    fn service_with_observer(observer: Arc<dyn AuthErrorObserver>) -> OAuthService {
        OAuthService::new(test_config(), Arc::new(MemoryTokenStore::new()), observer).expect("service")
    }

    #[test]
    fn test_authorization_url_carries_client_and_scopes() {
        let service = service_with_observer(Arc::new(TracingErrorObserver));
        let (url, state) = service.authorization_url().expect("authorization url");

        assert!(url.as_str().starts_with("https://github.test/login/oauth/authorize"));
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("client_id".to_owned(), "test-client".to_owned())));
        assert!(query.contains(&("scope".to_owned(), "read:org user:email".to_owned())));
        assert!(query.iter().any(|(k, v)| k == "state" && !v.is_empty()));
        assert!(!state.secret().is_empty());
    }

    #[test]
    fn test_provider_error_reaches_observer() {
        let observer = Arc::new(CountingObserver::default());
        let service = service_with_observer(Arc::<CountingObserver>::clone(&observer));

        service.handle_provider_error(&AuthorizationError {
            error: "access_denied".to_owned(),
            description: Some("The user has denied your application access.".to_owned()),
            uri: None,
        });
        service.handle_provider_error(&AuthorizationError {
            error: "server_error".to_owned(),
            description: None,
            uri: None,
        });

        assert_eq!(observer.seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_endpoint_url_is_rejected() {
        let mut config = test_config();
        config.authorize_url = "not a url".to_owned();
        let service =
            OAuthService::new(config, Arc::new(MemoryTokenStore::new()), Arc::new(TracingErrorObserver))
                .expect("service");
        assert!(service.authorization_url().is_err());
    }
}
