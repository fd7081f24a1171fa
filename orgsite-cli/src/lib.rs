// Export logic lives in orgsite-core.
// This crate adds config discovery and the command-line wrapper.

pub mod settings;

// Re-export core types for convenience
pub use orgsite_core::*;

pub use settings::{config_path, parse_export_date, user_config_path};
