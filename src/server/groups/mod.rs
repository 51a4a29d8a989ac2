pub mod access;
mod libraries;
mod projection;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
};

use crate::server::AppState;

pub use projection::GroupLibraryInfo;

pub fn groups_router() -> Router<Arc<AppState>> {
    Router::new()
        // Group libraries
        .route(
            "/groups/{group_id}/libraries/",
            get(libraries::list_group_libraries).post(libraries::create_group_library),
        )
        .route(
            "/groups/{group_id}/libraries",
            get(libraries::list_group_libraries).post(libraries::create_group_library),
        )
        .route(
            "/groups/{group_id}/libraries/{repo_id}/",
            delete(libraries::delete_group_library),
        )
        .route(
            "/groups/{group_id}/libraries/{repo_id}",
            delete(libraries::delete_group_library),
        )
}
