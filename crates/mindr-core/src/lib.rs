pub mod config;
pub mod error;
pub mod types;

pub use config::MindrConfig;
pub use error::{MindrError, Result};
pub use types::*;
