// orgsite Core Library
//
// Exports Org outline documents for Hugo-style static sites.
// A small host engine parses and walks the document; the rules module
// rewrites footnotes, file links, sections and the document template.

pub mod types;
pub mod errors;
pub mod config;
pub mod parser;
pub mod host;
pub mod rules;
pub mod processor;
pub mod storage;

// Re-export main types and functions for easy use
pub use types::*;
pub use errors::{ExportError, ExportResult};
pub use config::{ConfigLayer, ExportConfiguration, HostOptions};
pub use parser::parse_org;
pub use host::{ExportHost, Exporter};
pub use rules::{DebugConfig, RuleSet, TransformRule};
pub use processor::{
    output_path, slugify, ExportJob, ExportOutput, ExportProcessor, ExportScope, ExportTarget,
};
pub use storage::{ExportStorage, FileStorage, MemoryStorage};
