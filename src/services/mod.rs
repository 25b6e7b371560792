pub mod github_session;
pub mod oauth_service;
pub mod org_service;
