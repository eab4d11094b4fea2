pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod meta;
pub mod types;

pub use config::{PasswordHashParams, SyncConfig};
pub use constants::*;
pub use error::MemoryError;
pub use types::*;
