use crate::config::ServerConfig;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Capability, Group, Repo, User};

/// Loads the group every group endpoint operates on.
pub fn require_group(store: &dyn Store, group_id: i64) -> Result<Group, ApiError> {
    store
        .get_group(group_id)
        .api_err("Failed to get group")?
        .or_not_found(format!("Group {group_id} not found."))
}

pub fn require_group_member(store: &dyn Store, group_id: i64, user: &User) -> Result<(), ApiError> {
    if store
        .is_group_member(group_id, &user.email)
        .api_err("Failed to check group membership")?
    {
        Ok(())
    } else {
        Err(ApiError::permission_denied())
    }
}

pub fn require_capability(
    config: &ServerConfig,
    user: &User,
    required: Capability,
) -> Result<(), ApiError> {
    if config.role_capabilities(&user.role).has(required) {
        Ok(())
    } else {
        Err(ApiError::permission_denied())
    }
}

/// Org id for requests made by organization members on a multi-tenant deployment.
#[must_use]
pub fn org_context(config: &ServerConfig, user: &User) -> Option<i64> {
    if config.cloud_mode { user.org_id } else { None }
}

/// Group admins, the library owner and library admins may remove a library from a group.
pub fn can_delete_group_library(
    store: &dyn Store,
    group_id: i64,
    repo: &Repo,
    user: &User,
) -> Result<bool, ApiError> {
    if store
        .is_group_admin(group_id, &user.email)
        .api_err("Failed to check group admin")?
    {
        return Ok(true);
    }

    let owner = store
        .get_repo_owner(&repo.id)
        .api_err("Failed to get library owner")?;
    if owner.as_deref() == Some(user.email.as_str()) {
        return Ok(true);
    }

    store
        .is_repo_admin(&user.email, &repo.id)
        .api_err("Failed to check library admin")
}
