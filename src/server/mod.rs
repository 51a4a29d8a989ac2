pub mod dto;
mod groups;
pub mod response;
mod router;
pub mod validation;

pub use groups::{GroupLibraryInfo, groups_router};
pub use router::{AppState, create_router};
