mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, RequireUser};
pub use token::{TokenGenerator, hash_secret, parse_token};
