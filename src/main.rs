use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use grouplib::cli::{
    AdminCommands, GroupCommands, LibraryCommands, MemberCommands, OrgCommands, ServerArgs,
    UserCommands, run_group_add, run_init, run_library_create, run_library_delete,
    run_library_list, run_member_add, run_org_add, run_user_add,
};
use grouplib::config::ServerConfig;
use grouplib::events::spawn_recorder;
use grouplib::server::{AppState, create_router};
use grouplib::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "grouplib")]
#[command(about = "Group library server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Use org-scoped library calls for organization members
        #[arg(long)]
        cloud_mode: bool,

        /// Allow password-protected libraries
        #[arg(long)]
        enable_encrypted_library: Option<bool>,
    },

    /// Manage the libraries of a group on a running server
    Libraries {
        #[command(flatten)]
        server: ServerArgs,

        #[command(subcommand)]
        command: LibraryCommands,
    },
}

fn load_config(
    path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
    cloud_mode: bool,
    enable_encrypted_library: Option<bool>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir.into();
    }
    if cloud_mode {
        config.cloud_mode = true;
    }
    if let Some(enabled) = enable_encrypted_library {
        config.enable_encrypted_library = enabled;
    }

    Ok(config)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!("Server not initialized. Run 'grouplib admin init' first to create the database.");
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let addr = config.socket_addr()?;
    info!(
        cloud_mode = config.cloud_mode,
        encrypted_libraries = config.enable_encrypted_library,
        "Using database at {}",
        db_path.display()
    );

    let state = Arc::new(AppState::new(Arc::new(store), config));
    let _recorder = spawn_recorder(&state.events, state.store.clone());

    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("grouplib=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    email,
                    name,
                    contact_email,
                    role,
                    org_id,
                    create_token,
                    non_interactive,
                } => run_user_add(
                    data_dir,
                    email,
                    name,
                    contact_email,
                    role,
                    org_id,
                    create_token,
                    non_interactive,
                )?,
            },
            AdminCommands::Org { command } => match command {
                OrgCommands::Add { data_dir, name } => run_org_add(data_dir, name)?,
            },
            AdminCommands::Group { command } => match command {
                GroupCommands::Add {
                    data_dir,
                    name,
                    owner,
                    org_id,
                } => run_group_add(data_dir, name, owner, org_id)?,
                GroupCommands::Member { command } => match command {
                    MemberCommands::Add {
                        data_dir,
                        group_id,
                        email,
                        admin,
                    } => run_member_add(data_dir, group_id, email, admin)?,
                },
            },
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            cloud_mode,
            enable_encrypted_library,
        } => {
            let config = load_config(
                config,
                host,
                port,
                data_dir,
                cloud_mode,
                enable_encrypted_library,
            )?;
            tokio::runtime::Runtime::new()?.block_on(serve(config))?;
        }
        Commands::Libraries { server, command } => match command {
            LibraryCommands::List { group_id, json } => run_library_list(&server, group_id, json)?,
            LibraryCommands::Create {
                group_id,
                name,
                permission,
                password,
                json,
            } => run_library_create(&server, group_id, name, permission, password, json)?,
            LibraryCommands::Delete { group_id, repo_id } => {
                run_library_delete(&server, group_id, repo_id)?;
            }
        },
    }

    Ok(())
}
