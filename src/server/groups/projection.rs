use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Store;
use crate::types::{GroupRepo, Repo, SharePermission};

/// A library as returned by the group library endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLibraryInfo {
    pub repo_id: String,
    pub repo_name: String,
    pub mtime: String,
    pub permission: SharePermission,
    pub size: i64,
    pub encrypted: bool,
    pub owner_email: String,
    pub owner_name: String,
    pub owner_contact_email: String,
    pub modifier_email: String,
    pub modifier_name: String,
    pub modifier_contact_email: String,
}

/// ISO-8601 in UTC, whole seconds.
#[must_use]
pub fn format_mtime(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn project(
    store: &dyn Store,
    repo: &Repo,
    owner: &str,
    permission: SharePermission,
) -> GroupLibraryInfo {
    GroupLibraryInfo {
        repo_id: repo.id.clone(),
        repo_name: repo.name.clone(),
        mtime: format_mtime(repo.last_modified),
        permission,
        size: repo.size,
        encrypted: repo.encrypted,
        owner_email: owner.to_string(),
        owner_name: store.display_name(owner),
        owner_contact_email: store.contact_email(owner),
        modifier_email: repo.last_modifier.clone(),
        modifier_name: store.display_name(&repo.last_modifier),
        modifier_contact_email: store.contact_email(&repo.last_modifier),
    }
}

#[must_use]
pub fn project_group_repo(store: &dyn Store, group_repo: &GroupRepo) -> GroupLibraryInfo {
    project(
        store,
        &group_repo.repo,
        &group_repo.repo.owner,
        group_repo.permission,
    )
}

/// Projection of a library that was just created by `creator`.
#[must_use]
pub fn project_new_library(
    store: &dyn Store,
    repo: &Repo,
    creator: &str,
    permission: SharePermission,
) -> GroupLibraryInfo {
    project(store, repo, creator, permission)
}
