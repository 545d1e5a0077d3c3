pub mod auth;
pub mod error;
pub mod types;

pub use auth::*;
pub use error::*;
pub use types::*;
