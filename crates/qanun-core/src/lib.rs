pub mod config;
pub mod error;
pub mod types;

pub use config::{Credentials, QanunConfig, SearchCredentials};
pub use error::{QanunError, Result};
pub use types::*;
