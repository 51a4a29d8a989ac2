mod models;
mod permission;

pub use models::*;
pub use permission::{Capability, SharePermission};
