use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create the database)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Manage groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user and optionally an access token
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the new user
        #[arg(long)]
        email: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Contact email shown to other users
        #[arg(long)]
        contact_email: Option<String>,

        /// Role name (default, guest, or a configured role)
        #[arg(long, default_value = "default")]
        role: String,

        /// Organization the user belongs to
        #[arg(long)]
        org_id: Option<i64>,

        /// Create a token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --email)
        #[arg(long)]
        non_interactive: bool,
    },
}

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Add a new organization
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Organization name
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Add a new group; the owner becomes its first admin
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Group name
        #[arg(long)]
        name: String,

        /// Email of the group owner
        #[arg(long)]
        owner: String,

        /// Create the group inside an organization
        #[arg(long)]
        org_id: Option<i64>,
    },

    /// Manage group members
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a user to a group
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        group_id: i64,

        #[arg(long)]
        email: String,

        /// Make the member a group admin
        #[arg(long)]
        admin: bool,
    },
}

/// Connection settings for commands that talk to a running server.
#[derive(Args)]
pub struct ServerArgs {
    /// Server base URL
    #[arg(long, env = "GROUPLIB_SERVER", default_value = "http://127.0.0.1:8000")]
    pub server: String,

    /// Access token
    #[arg(long, env = "GROUPLIB_TOKEN", hide_env_values = true)]
    pub token: String,
}

#[derive(Subcommand)]
pub enum LibraryCommands {
    /// List the libraries shared to a group
    List {
        #[arg(long)]
        group_id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a library and share it to a group
    Create {
        #[arg(long)]
        group_id: i64,

        /// Library name
        #[arg(long)]
        name: String,

        /// Group permission: r or rw
        #[arg(long, default_value = "rw")]
        permission: String,

        /// Password for an encrypted library
        #[arg(long)]
        password: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Unshare a library from a group
    Delete {
        #[arg(long)]
        group_id: i64,

        #[arg(long)]
        repo_id: String,
    },
}
