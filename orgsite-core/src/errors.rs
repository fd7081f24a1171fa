use thiserror::Error;

/// Errors raised during an export pass.
///
/// Export is all-or-nothing: any of these aborts the pass and is returned
/// to the caller unchanged.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A required setting is missing or unusable (e.g. empty export path).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A footnote reference whose definition cannot be found.
    #[error("unresolved footnote reference: [fn:{label}]")]
    UnresolvedFootnote { label: String },

    /// Raised by a host default rule or the host walker itself.
    #[error("{rule} rendering failed: {message}")]
    HostRendering { rule: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn host_rendering(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostRendering {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;
