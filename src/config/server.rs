use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Capability;

pub const DEFAULT_ROLE: &str = "default";
pub const GUEST_ROLE: &str = "guest";
pub const DB_FILE: &str = "grouplib.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Multi-tenant deployment. Requests from organization members use the
    /// org-scoped repository calls only when this is on.
    pub cloud_mode: bool,
    /// Allows creating password-protected libraries.
    pub enable_encrypted_library: bool,
    /// Role name to capability names, e.g. `employee = ["can_add_repo"]`.
    /// Entries here replace the built-in `default` and `guest` roles.
    pub roles: HashMap<String, Vec<String>>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (role, names) in &self.roles {
            if Capability::parse_many(names).is_none() {
                return Err(Error::Config(format!(
                    "role '{role}' lists an unknown capability: {names:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    /// Resolves the capabilities of a role. Unknown roles get the `default` role.
    #[must_use]
    pub fn role_capabilities(&self, role: &str) -> Capability {
        if let Some(names) = self.roles.get(role) {
            return Capability::parse_many(names).unwrap_or_default();
        }
        match role {
            GUEST_ROLE => Capability::none(),
            DEFAULT_ROLE => Capability::all(),
            _ => self.role_capabilities(DEFAULT_ROLE),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: PathBuf::from("./data"),
            cloud_mode: false,
            enable_encrypted_library: true,
            roles: HashMap::new(),
        }
    }
}
