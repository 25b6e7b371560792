use crate::config::GithubConfig;
use crate::domain::member::{Email, Member, OrgUser};
use crate::domain::project::Project;
use crate::error::{AppError, Result};
use crate::services::github_session::{Credential, GithubSession};
use crate::storage::TokenStore;
use opentelemetry::{KeyValue, global, metrics::Counter};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
struct Metrics {
    membership_changes_total: Counter<u64>,
    issues_created_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("bandstand");
        Self {
            membership_changes_total: meter
                .u64_counter("org_membership_changes_total")
                .with_description("Membership mutations issued against the organization")
                .build(),
            issues_created_total: meter
                .u64_counter("org_issues_created_total")
                .with_description("Issues filed through the admin session")
                .build(),
        }
    }
}

/// Organization-management operations, issued through the fixed admin
/// credential; user-scoped calls borrow the acting user's stored token.
#[derive(Clone)]
pub struct OrgService {
    config: GithubConfig,
    admin_session: GithubSession,
    tokens: Arc<dyn TokenStore>,
    metrics: Metrics,
}

impl std::fmt::Debug for OrgService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgService")
            .field("org", &self.config.org)
            .field("admin_session", &self.admin_session)
            .finish_non_exhaustive()
    }
}

impl OrgService {
    /// Builds the service and its admin session. The admin session is
    /// constructed here, once, and shared for the service lifetime.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the configured base URL is invalid.
    pub fn new(config: GithubConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let admin_session = GithubSession::new(
            &config,
            Credential::App {
                token: config.admin_access_token.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            },
        )?;

        Ok(Self { config, admin_session, tokens, metrics: Metrics::new() })
    }

    /// Adds the user with the given login to the members team. Repeated
    /// calls succeed: the membership PUT is idempotent on the provider side.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn join_organization(&self, login: &str) -> Result<()> {
        let path = format!("teams/{}/memberships/{login}", self.config.members_team_id);
        self.admin_session.put(&path).await?.error_for_status()?;
        self.metrics.membership_changes_total.add(1, &[KeyValue::new("change", "join")]);
        Ok(())
    }

    /// Removes the user with the given login from the organization.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn leave_organization(&self, login: &str) -> Result<()> {
        let path = format!("orgs/{}/memberships/{login}", self.config.org);
        self.admin_session.delete(&path).await?.error_for_status()?;
        self.metrics.membership_changes_total.add(1, &[KeyValue::new("change", "leave")]);
        Ok(())
    }

    /// Whether the user with the given login is an organization member.
    ///
    /// Any failure of the lookup, 404 included, reads as "not a member";
    /// callers cannot distinguish absence from a transient failure.
    #[tracing::instrument(skip(self))]
    pub async fn is_member(&self, login: &str) -> bool {
        let path = format!("orgs/{}/members/{login}", self.config.org);
        match self.admin_session.get(&path).await {
            Ok(response) => response.error_for_status().is_ok(),
            Err(_) => false,
        }
    }

    /// All members of the members team, annotated with roadie and 2FA flags
    /// derived from two further paginated queries keyed on the member id.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn get_members(&self) -> Result<Vec<Member>> {
        let without_2fa: HashSet<u64> = self.get_without_2fa().await?.into_iter().map(|u| u.id).collect();
        let roadies: HashSet<u64> = self.get_roadies().await?.into_iter().map(|u| u.id).collect();

        let path = format!("teams/{}/members", self.config.members_team_id);
        let all_members: Vec<OrgUser> = serde_json::from_value(self.admin_session.get_all_pages(&path).await?)?;

        Ok(annotate(all_members, &roadies, &without_2fa))
    }

    /// Organization members without two-factor authentication enabled.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn get_without_2fa(&self) -> Result<Vec<OrgUser>> {
        let path = format!("orgs/{}/members?filter=2fa_disabled", self.config.org);
        Ok(serde_json::from_value(self.admin_session.get_all_pages(&path).await?)?)
    }

    /// Members of the roadies (maintainers) team.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn get_roadies(&self) -> Result<Vec<OrgUser>> {
        let path = format!("teams/{}/members", self.config.roadies_team_id);
        Ok(serde_json::from_value(self.admin_session.get_all_pages(&path).await?)?)
    }

    /// Makes the user's organization membership publicly visible.
    /// Fire-and-forget: the response status is not inspected.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn publicize_membership(&self, login: &str) -> Result<()> {
        let path = format!("orgs/{}/public_members/{login}", self.config.org);
        self.admin_session.put(&path).await?;
        Ok(())
    }

    /// The organization's public repositories, each annotated with its
    /// subscriber count. Issues one follow-up paginated call per
    /// repository, sequentially.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let path = format!("orgs/{}/repos?type=public", self.config.org);
        let mut projects: Vec<Project> = serde_json::from_value(self.admin_session.get_all_pages(&path).await?)?;

        for project in &mut projects {
            let subscribers = self
                .admin_session
                .get_all_pages(&format!("repos/{}/{}/subscribers", self.config.org, project.name))
                .await?;
            project.subscribers_count = subscribers.as_array().map_or(0, Vec::len);
        }

        Ok(projects)
    }

    /// The email addresses of the given user, fetched with that user's own
    /// stored token.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if no token is stored for the user.
    #[tracing::instrument(skip(self), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn get_emails(&self, user_id: Uuid) -> Result<Vec<Email>> {
        let token = self.tokens.load(user_id).await?.ok_or(AppError::AuthError)?;
        let session = GithubSession::new(&self.config, Credential::Bearer(token.access_token))?;
        Ok(serde_json::from_value(session.get_all_pages("user/emails").await?)?)
    }

    /// Files an issue in one of the organization's repositories.
    #[tracing::instrument(skip(self, issue), err(level = "warn"))]
    pub async fn new_project_issue(&self, project: &str, issue: &Value) -> Result<Value> {
        self.new_project_issue_in(&self.config.org, project, issue).await
    }

    /// Files an issue in an arbitrary org/repository pair.
    #[tracing::instrument(skip(self, issue), err(level = "warn"))]
    pub async fn new_project_issue_in(&self, org: &str, project: &str, issue: &Value) -> Result<Value> {
        let response = self.admin_session.post(&format!("repos/{org}/{project}/issues"), issue).await?;
        let created = response.error_for_status()?.json().await?;
        self.metrics.issues_created_total.add(1, &[]);
        Ok(created)
    }

    /// Files an issue in the roadies help repository.
    #[tracing::instrument(skip(self, issue), err(level = "warn"))]
    pub async fn new_roadies_issue(&self, issue: &Value) -> Result<Value> {
        self.new_project_issue_in(&self.config.roadies_org, &self.config.roadies_help_repo, issue).await
    }
}

fn annotate(all_members: Vec<OrgUser>, roadies: &HashSet<u64>, without_2fa: &HashSet<u64>) -> Vec<Member> {
    all_members
        .into_iter()
        .map(|user| Member {
            is_member: true,
            is_roadie: roadies.contains(&user.id),
            has_2fa: !without_2fa.contains(&user.id),
            user,
        })
        .collect()
}
