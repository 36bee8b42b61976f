/// The current version of tailgate, sourced from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod agent;
pub mod commands;
pub mod config;
pub mod tail;
pub mod types;
