use serde::{Deserialize, Serialize};

/// Raw member record as returned by the team- and org-membership endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgUser {
    pub id: u64,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Org member annotated with the membership-audit flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    #[serde(flatten)]
    pub user: OrgUser,
    pub is_member: bool,
    pub is_roadie: bool,
    pub has_2fa: bool,
}

/// Email address record from the `user/emails` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Email {
    pub email: String,
    pub verified: bool,
    pub primary: bool,
}
