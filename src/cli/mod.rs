mod admin;
mod commands;
pub mod http_client;
mod libraries;

pub use admin::{run_group_add, run_init, run_member_add, run_org_add, run_user_add};
pub use commands::{
    AdminCommands, GroupCommands, LibraryCommands, MemberCommands, OrgCommands, ServerArgs,
    UserCommands,
};
pub use libraries::{run_library_create, run_library_delete, run_library_list};

use crate::config::DB_FILE;
use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'grouplib admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
