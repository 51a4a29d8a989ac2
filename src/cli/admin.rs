use std::fs;

use chrono::Utc;
use inquire::{Confirm, Text};

use crate::auth::TokenGenerator;
use crate::config::{DB_FILE, DEFAULT_ROLE};
use crate::store::{SqliteStore, Store};
use crate::types::User;

use super::init_store;

fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        _ if email.chars().any(char::is_whitespace) => {
            Err("Email cannot contain whitespace".to_string())
        }
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(format!("'{email}' is not a valid email address")),
    }
}

pub fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join(DB_FILE);
    if db_path.exists() {
        anyhow::bail!("Server already initialized. Database exists at: {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());

    if !non_interactive {
        create_first_user_prompt(&store)?;
    }

    Ok(())
}

fn create_first_user_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_user = Confirm::new("Would you like to create a first user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = Text::new("Email:")
        .with_validator(|input: &str| {
            Ok(validate_email(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
        })
        .prompt()?;

    add_user(store, &email, None, None, DEFAULT_ROLE, None)?;
    issue_token(store, &email)?;

    Ok(())
}

fn add_user(
    store: &SqliteStore,
    email: &str,
    name: Option<String>,
    contact_email: Option<String>,
    role: &str,
    org_id: Option<i64>,
) -> anyhow::Result<()> {
    if store.get_user(email)?.is_some() {
        anyhow::bail!("User '{}' already exists", email);
    }

    if let Some(org_id) = org_id {
        if store.get_org(org_id)?.is_none() {
            anyhow::bail!("Organization {} not found", org_id);
        }
    }

    let user = User {
        email: email.to_string(),
        nickname: name,
        contact_email,
        role: role.to_string(),
        org_id,
        created_at: Utc::now(),
    };
    store.create_user(&user)?;

    println!();
    println!("Created user \"{email}\" with role \"{role}\"");

    Ok(())
}

fn issue_token(store: &SqliteStore, email: &str) -> anyhow::Result<()> {
    let generator = TokenGenerator::new();
    let (token, raw_token) = generator.issue(email)?;
    store.create_token(&token)?;

    println!();
    println!("Token created: {raw_token}");
    println!("  Save this now - it cannot be retrieved later.");
    println!();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_user_add(
    data_dir: String,
    email: Option<String>,
    name: Option<String>,
    contact_email: Option<String>,
    role: String,
    org_id: Option<i64>,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let email = if let Some(email) = email {
        validate_email(&email).map_err(anyhow::Error::msg)?;
        email
    } else if non_interactive {
        anyhow::bail!("--email is required in non-interactive mode");
    } else {
        Text::new("Email:")
            .with_validator(|input: &str| {
                Ok(validate_email(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
            })
            .prompt()?
    };

    add_user(&store, &email, name, contact_email, &role, org_id)?;

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create access token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        issue_token(&store, &email)?;
    }

    Ok(())
}

pub fn run_org_add(data_dir: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    if name.trim().is_empty() {
        anyhow::bail!("Organization name cannot be empty");
    }

    let org = store.create_org(&name)?;
    println!("Created organization \"{}\" with id {}", org.name, org.org_id);

    Ok(())
}

pub fn run_group_add(
    data_dir: String,
    name: String,
    owner: String,
    org_id: Option<i64>,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    if name.trim().is_empty() {
        anyhow::bail!("Group name cannot be empty");
    }
    validate_email(&owner).map_err(anyhow::Error::msg)?;

    if let Some(org_id) = org_id {
        if store.get_org(org_id)?.is_none() {
            anyhow::bail!("Organization {} not found", org_id);
        }
    }

    let group = store.create_group(&name, &owner, org_id)?;
    println!("Created group \"{}\" with id {}", group.name, group.id);

    Ok(())
}

pub fn run_member_add(
    data_dir: String,
    group_id: i64,
    email: String,
    admin: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    validate_email(&email).map_err(anyhow::Error::msg)?;

    if store.get_group(group_id)?.is_none() {
        anyhow::bail!("Group {} not found", group_id);
    }

    store.add_group_member(group_id, &email, admin)?;
    let role = if admin { "admin" } else { "member" };
    println!("Added {email} to group {group_id} as {role}");

    Ok(())
}
