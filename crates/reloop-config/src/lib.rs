pub mod config;
pub mod discovery;
pub mod error;
pub mod process;
pub mod server;
pub mod validation;

// Re-export main types
pub use config::*;
pub use error::*;
pub use process::*;
pub use server::*;

// Re-export discovery and validation
pub use discovery::{discover, discover_with_profile, ConfigDiscovery, CONFIG_FILE};
pub use validation::{validate_fs, validate_schema, ConfigValidator, FsValidator, SchemaValidator};
