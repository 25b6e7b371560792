use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "BANDSTAND_DATABASE_URL")]
    pub database_url: String,

    #[command(flatten)]
    pub github: GithubConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct GithubConfig {
    /// OAuth app client id
    #[arg(long, env = "BANDSTAND_GITHUB_CLIENT_ID")]
    pub client_id: String,

    /// OAuth app client secret
    #[arg(long, env = "BANDSTAND_GITHUB_CLIENT_SECRET")]
    pub client_secret: String,

    /// Scopes requested during user authorization
    #[arg(long, env = "BANDSTAND_GITHUB_SCOPE", default_value = "read:org,user:email")]
    pub scope: String,

    /// Login of the managed organization
    #[arg(long, env = "BANDSTAND_GITHUB_ORG", default_value = "bandstand")]
    pub org: String,

    /// Team holding regular members
    #[arg(long, env = "BANDSTAND_GITHUB_MEMBERS_TEAM_ID", default_value_t = 0)]
    pub members_team_id: u64,

    /// Team holding the roadies (maintainers)
    #[arg(long, env = "BANDSTAND_GITHUB_ROADIES_TEAM_ID", default_value_t = 0)]
    pub roadies_team_id: u64,

    /// Personal access token with org-admin permissions
    #[arg(long, env = "BANDSTAND_GITHUB_ADMIN_TOKEN")]
    pub admin_access_token: String,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "BANDSTAND_GITHUB_API_BASE_URL", default_value = "https://api.github.com/")]
    pub api_base_url: String,

    /// Authorization endpoint of the OAuth web flow
    #[arg(
        long,
        env = "BANDSTAND_GITHUB_AUTHORIZE_URL",
        default_value = "https://github.com/login/oauth/authorize"
    )]
    pub authorize_url: String,

    /// Token endpoint of the OAuth web flow
    #[arg(
        long,
        env = "BANDSTAND_GITHUB_TOKEN_URL",
        default_value = "https://github.com/login/oauth/access_token"
    )]
    pub token_url: String,

    /// Callback URL registered with the OAuth app
    #[arg(long, env = "BANDSTAND_GITHUB_REDIRECT_URL")]
    pub redirect_url: String,

    /// Organization receiving roadies help issues
    #[arg(long, env = "BANDSTAND_GITHUB_ROADIES_ORG", default_value = "bandstand-roadies")]
    pub roadies_org: String,

    /// Repository receiving roadies help issues
    #[arg(long, env = "BANDSTAND_GITHUB_ROADIES_HELP_REPO", default_value = "help")]
    pub roadies_help_repo: String,

    /// Per-request timeout for GitHub API calls
    #[arg(long, env = "BANDSTAND_GITHUB_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics; telemetry export is disabled when unset
    #[arg(long, env = "BANDSTAND_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "BANDSTAND_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}
