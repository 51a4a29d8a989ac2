use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SharePermission;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Org {
    pub org_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub creator: String,
    /// Set for groups created inside an organization. Never changes afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A library record as held by the repository service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: String,
    pub last_modifier: String,
    /// Unix timestamp, seconds.
    pub last_modified: i64,
    pub size: i64,
    pub encrypted: bool,
    /// Parent library of a sub-library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_repo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
}

impl Repo {
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.origin_repo_id.is_some()
    }
}

/// A library as seen through its binding to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRepo {
    #[serde(flatten)]
    pub repo: Repo,
    pub group_id: i64,
    pub permission: SharePermission,
    /// User who shared the library to the group.
    pub shared_by: String,
}

/// Permission change record sent to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermAudit {
    pub etype: String,
    pub actor: String,
    pub group_id: i64,
    pub repo_id: String,
    pub path: String,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCreated {
    /// -1 when the library was created outside an organization.
    pub org_id: i64,
    pub creator: String,
    pub repo_id: String,
    pub repo_name: String,
    pub library_template: String,
    pub created_at: DateTime<Utc>,
}
