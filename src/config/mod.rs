mod server;

pub use server::{DB_FILE, DEFAULT_ROLE, GUEST_ROLE, ServerConfig};
