use bandstand::config::GithubConfig;
use bandstand::domain::token::AuthorizationError;
use bandstand::services::oauth_service::{AuthErrorObserver, OAuthService};
use bandstand::services::org_service::OrgService;
use bandstand::storage::TokenStore;
use bandstand::storage::memory::MemoryTokenStore;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("bandstand=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// Config pointing every GitHub endpoint at the given mock server URI.
#[allow(dead_code)]
pub fn github_config(server_uri: &str) -> GithubConfig {
    GithubConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        scope: "read:org,user:email".to_string(),
        org: "bandstand".to_string(),
        members_team_id: 1,
        roadies_team_id: 2,
        admin_access_token: "admin-token".to_string(),
        api_base_url: format!("{server_uri}/"),
        authorize_url: format!("{server_uri}/login/oauth/authorize"),
        token_url: format!("{server_uri}/login/oauth/access_token"),
        redirect_url: "https://bandstand.test/callback".to_string(),
        roadies_org: "bandstand-roadies".to_string(),
        roadies_help_repo: "help".to_string(),
        request_timeout_secs: 5,
    }
}

#[allow(dead_code)]
pub fn org_service(server_uri: &str) -> (OrgService, Arc<MemoryTokenStore>) {
    setup_tracing();
    let store = Arc::new(MemoryTokenStore::new());
    let tokens: Arc<dyn TokenStore> = store.clone();
    let service = OrgService::new(github_config(server_uri), tokens).expect("Failed to build org service");
    (service, store)
}

#[allow(dead_code)]
pub fn oauth_service(server_uri: &str) -> (OAuthService, Arc<MemoryTokenStore>, Arc<CountingObserver>) {
    setup_tracing();
    let store = Arc::new(MemoryTokenStore::new());
    let observer = Arc::new(CountingObserver::default());
    let tokens: Arc<dyn TokenStore> = store.clone();
    let hook: Arc<dyn AuthErrorObserver> = observer.clone();
    let service =
        OAuthService::new(github_config(server_uri), tokens, hook).expect("Failed to build oauth service");
    (service, store, observer)
}

/// Records every authorization error it sees, for assertions.
#[derive(Debug, Default)]
pub struct CountingObserver {
    seen: AtomicUsize,
}

#[allow(dead_code)]
impl CountingObserver {
    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl AuthErrorObserver for CountingObserver {
    fn on_authorization_error(&self, _error: &AuthorizationError) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}
