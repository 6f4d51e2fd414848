pub mod config;
pub mod error;
pub mod gazetteer;
pub mod types;

pub use config::{AdapterConfig, Config};
pub use error::IceWatchError;
pub use types::*;
