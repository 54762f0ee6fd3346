//! Configuration system
//!
//! Layered configuration: built-in defaults, then a YAML config file, then
//! environment variables. Command-line flags are applied on top by the CLI.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{ChecksConfig, Config, OutputFormat};
