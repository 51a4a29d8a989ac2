use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Request, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::events::Event;
use crate::server::AppState;
use crate::server::dto::{RequestFields, SuccessResponse};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_repo_name;
use crate::types::{Capability, GroupRepo, PermAudit, RepoCreated, SharePermission};

use super::access::{
    can_delete_group_library, org_context, require_capability, require_group,
    require_group_member,
};
use super::projection::{GroupLibraryInfo, project_group_repo, project_new_library};

const DELETE_REPO_PERM: &str = "delete-repo-perm";

pub async fn list_group_libraries(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();

    require_group(store, group_id)?;
    require_group_member(store, group_id, user)?;

    let mut repos: Vec<GroupRepo> = match org_context(&state.config, user) {
        Some(org_id) => store
            .list_org_group_repos(org_id, group_id)
            .api_err("Failed to list group libraries")?,
        None => store
            .list_group_repos(group_id)
            .api_err("Failed to list group libraries")?,
    };

    // Most recently modified first; ties keep the store order
    repos.sort_by(|a, b| b.repo.last_modified.cmp(&a.repo.last_modified));

    let libraries: Vec<GroupLibraryInfo> = repos
        .iter()
        .map(|r| project_group_repo(store, r))
        .collect();

    Ok::<_, ApiError>(Json(libraries))
}

pub async fn create_group_library(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
    request: Request,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();

    require_group(store, group_id)?;

    // Read only once the group is known to exist
    let fields = RequestFields::read(request).await?;

    let repo_name = validate_repo_name(fields.text("repo_name")?)?;

    let password = fields.text("password")?.filter(|p| !p.is_empty());
    if password.is_some() && !state.config.enable_encrypted_library {
        return Err(ApiError::forbidden("NOT allow to create encrypted library."));
    }

    let permission = match fields.text("permission")? {
        None => SharePermission::ReadWrite,
        Some(value) => SharePermission::parse(value)
            .filter(|p| p.is_assignable_on_create())
            .ok_or_else(|| ApiError::bad_request("permission invalid."))?,
    };

    let library_template = fields.text("library_template")?.unwrap_or_default();

    require_capability(&state.config, user, Capability::ADD_REPO)?;
    require_group_member(store, group_id, user)?;

    let org_id = org_context(&state.config, user);

    let repo_id = match org_id {
        Some(org_id) => store.create_org_repo(repo_name, "", &user.email, password, org_id),
        None => store.create_repo(repo_name, "", &user.email, password),
    }
    .api_err("Failed to create library")?;

    let shared = match org_id {
        Some(org_id) => {
            store.bind_org_group_repo(&repo_id, org_id, group_id, &user.email, permission)
        }
        None => store.bind_group_repo(&repo_id, group_id, &user.email, permission),
    };

    if let Err(e) = shared {
        tracing::error!("Failed to share library {repo_id} to group {group_id}: {e}");
        if let Err(e) = store.delete_repo(&repo_id) {
            tracing::error!("Failed to remove unshared library {repo_id}: {e}");
        }
        return Err(ApiError::internal("Failed to share library to group"));
    }

    state.events.publish(Event::RepoCreated(RepoCreated {
        org_id: org_id.unwrap_or(-1),
        creator: user.email.clone(),
        repo_id: repo_id.clone(),
        repo_name: repo_name.to_string(),
        library_template: library_template.to_string(),
        created_at: Utc::now(),
    }));

    let repo = store
        .get_repo(&repo_id)
        .api_err("Failed to get library")?
        .ok_or_else(|| ApiError::internal("Failed to get library"))?;

    tracing::info!(
        repo_id = %repo.id,
        group_id,
        creator = %user.email,
        "created group library"
    );

    Ok::<_, ApiError>(Json(project_new_library(
        store,
        &repo,
        &user.email,
        permission,
    )))
}

pub async fn delete_group_library(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((group_id, repo_id)): Path<(i64, String)>,
) -> impl IntoResponse {
    let user = &auth.user;
    let store = state.store.as_ref();

    require_group(store, group_id)?;

    let repo = store
        .get_repo(&repo_id)
        .api_err("Failed to get library")?
        .or_not_found(format!("Library {repo_id} not found."))?;

    if !can_delete_group_library(store, group_id, &repo, user)? {
        return Err(ApiError::permission_denied());
    }

    if store
        .is_org_group(group_id)
        .api_err("Failed to check group organization")?
    {
        let org_id = store
            .get_org_id_for_group(group_id)
            .api_err("Failed to get group organization")?
            .ok_or_else(|| ApiError::internal("Failed to get group organization"))?;
        store
            .unbind_org_group_repo(&repo_id, org_id, group_id)
            .api_err("Failed to unshare library")?;
    } else {
        store
            .unbind_group_repo(&repo_id, group_id)
            .api_err("Failed to unshare library")?;
    }

    store
        .delete_extra_group_permission(&repo_id, group_id)
        .api_err("Failed to delete share permission")?;

    let current = match store.get_repo(&repo_id).api_err("Failed to get library")? {
        Some(current) => current,
        None => {
            tracing::warn!("Library {repo_id} disappeared while unsharing; auditing previous record");
            repo
        }
    };

    state.events.publish(Event::PermAudit(PermAudit {
        etype: DELETE_REPO_PERM.to_string(),
        actor: user.email.clone(),
        group_id,
        repo_id: current
            .origin_repo_id
            .clone()
            .unwrap_or_else(|| current.id.clone()),
        path: current.origin_path.clone().unwrap_or_else(|| "/".to_string()),
        permission: String::new(),
        created_at: Utc::now(),
    }));

    Ok::<_, ApiError>(Json(SuccessResponse { success: true }))
}
