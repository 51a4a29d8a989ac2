mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Repository, group, share-policy and user-directory services.
///
/// Handlers only talk to this trait. Every call is a single synchronous round
/// trip; callers decide which org-scoped or global variant to use.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User directory
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, email: &str) -> Result<Option<User>>;
    /// Nickname of a user, or the local part of the email when unknown.
    fn display_name(&self, email: &str) -> String;
    /// Contact email of a user, or the email itself when unknown.
    fn contact_email(&self, email: &str) -> String;

    // Organization operations
    fn create_org(&self, name: &str) -> Result<Org>;
    fn get_org(&self, org_id: i64) -> Result<Option<Org>>;

    // Group operations
    fn create_group(&self, name: &str, creator: &str, org_id: Option<i64>) -> Result<Group>;
    fn get_group(&self, group_id: i64) -> Result<Option<Group>>;
    fn is_org_group(&self, group_id: i64) -> Result<bool>;
    fn get_org_id_for_group(&self, group_id: i64) -> Result<Option<i64>>;
    fn add_group_member(&self, group_id: i64, email: &str, is_admin: bool) -> Result<()>;
    fn is_group_member(&self, group_id: i64, email: &str) -> Result<bool>;
    fn is_group_admin(&self, group_id: i64, email: &str) -> Result<bool>;

    // Repo operations
    fn create_repo(
        &self,
        name: &str,
        description: &str,
        owner: &str,
        password: Option<&str>,
    ) -> Result<String>;
    fn create_org_repo(
        &self,
        name: &str,
        description: &str,
        owner: &str,
        password: Option<&str>,
        org_id: i64,
    ) -> Result<String>;
    /// Creates a sub-library exposing `path` of `origin_repo_id`.
    fn create_sub_repo(
        &self,
        origin_repo_id: &str,
        path: &str,
        name: &str,
        owner: &str,
    ) -> Result<String>;
    fn get_repo(&self, repo_id: &str) -> Result<Option<Repo>>;
    fn get_repo_owner(&self, repo_id: &str) -> Result<Option<String>>;
    fn update_repo_stats(
        &self,
        repo_id: &str,
        modifier: &str,
        size: i64,
        last_modified: i64,
    ) -> Result<()>;
    fn delete_repo(&self, repo_id: &str) -> Result<bool>;

    // Group-repo bindings
    fn list_group_repos(&self, group_id: i64) -> Result<Vec<GroupRepo>>;
    fn list_org_group_repos(&self, org_id: i64, group_id: i64) -> Result<Vec<GroupRepo>>;
    fn bind_group_repo(
        &self,
        repo_id: &str,
        group_id: i64,
        shared_by: &str,
        permission: SharePermission,
    ) -> Result<()>;
    fn bind_org_group_repo(
        &self,
        repo_id: &str,
        org_id: i64,
        group_id: i64,
        shared_by: &str,
        permission: SharePermission,
    ) -> Result<()>;
    /// Returns false when there was no binding to remove.
    fn unbind_group_repo(&self, repo_id: &str, group_id: i64) -> Result<bool>;
    fn unbind_org_group_repo(&self, repo_id: &str, org_id: i64, group_id: i64) -> Result<bool>;

    // Share policy
    /// Fails with `NotFound` unless the library is shared to the group.
    fn set_extra_group_permission(
        &self,
        repo_id: &str,
        group_id: i64,
        permission: SharePermission,
    ) -> Result<()>;
    fn get_extra_group_permission(
        &self,
        repo_id: &str,
        group_id: i64,
    ) -> Result<Option<SharePermission>>;
    /// Idempotent; returns false when no row existed.
    fn delete_extra_group_permission(&self, repo_id: &str, group_id: i64) -> Result<bool>;
    fn set_extra_user_permission(
        &self,
        repo_id: &str,
        email: &str,
        permission: SharePermission,
    ) -> Result<()>;
    /// Group grants only count while the library is still shared to that group.
    fn is_repo_admin(&self, email: &str, repo_id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn delete_token(&self, id: &str) -> Result<bool>;

    // Event records
    fn record_perm_audit(&self, audit: &PermAudit) -> Result<()>;
    fn list_perm_audits(&self, repo_id: &str) -> Result<Vec<PermAudit>>;
    fn record_repo_created(&self, event: &RepoCreated) -> Result<()>;
    fn list_repo_created(&self, creator: &str) -> Result<Vec<RepoCreated>>;

    fn close(&self) -> Result<()>;
}
