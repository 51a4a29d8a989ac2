use crate::server::GroupLibraryInfo;
use crate::server::dto::{CreateGroupLibraryRequest, SuccessResponse};

use super::commands::ServerArgs;
use super::http_client::ApiClient;

fn client(args: &ServerArgs) -> anyhow::Result<ApiClient> {
    ApiClient::new(&args.server, &args.token)
}

pub fn run_library_list(args: &ServerArgs, group_id: i64, json: bool) -> anyhow::Result<()> {
    let libraries: Vec<GroupLibraryInfo> =
        client(args)?.get(&format!("/groups/{group_id}/libraries/"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&libraries)?);
        return Ok(());
    }

    if libraries.is_empty() {
        println!("No libraries shared to group {group_id}.");
        return Ok(());
    }

    for lib in &libraries {
        let lock = if lib.encrypted { " (encrypted)" } else { "" };
        println!(
            "{}  {}{}  [{}]  owner: {}  modified: {}",
            lib.repo_id, lib.repo_name, lock, lib.permission, lib.owner_email, lib.mtime
        );
    }

    Ok(())
}

pub fn run_library_create(
    args: &ServerArgs,
    group_id: i64,
    name: String,
    permission: String,
    password: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let req = CreateGroupLibraryRequest {
        repo_name: Some(name),
        password,
        permission: Some(permission),
        library_template: None,
    };

    let library: GroupLibraryInfo =
        client(args)?.post(&format!("/groups/{group_id}/libraries/"), &req)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&library)?);
    } else {
        println!(
            "Created library \"{}\" ({}) in group {group_id}",
            library.repo_name, library.repo_id
        );
    }

    Ok(())
}

pub fn run_library_delete(args: &ServerArgs, group_id: i64, repo_id: String) -> anyhow::Result<()> {
    let _: SuccessResponse =
        client(args)?.delete(&format!("/groups/{group_id}/libraries/{repo_id}/"))?;
    println!("Unshared library {repo_id} from group {group_id}");
    Ok(())
}
