use thiserror::Error;

/// Result type for apex-config operations
pub type Result<T> = std::result::Result<T, ApexConfigError>;

/// Main error type for loading, validating and deriving agent configurations
#[derive(Error, Debug)]
pub enum ApexConfigError {
    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or emit errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// A field the operation depends on is absent from the document
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The document parsed but violates a consistency rule
    #[error("Validation failed at '{path}': {reason}")]
    Validation {
        path: String,
        reason: String,
    },

    /// A dotted path could not be resolved or written
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

// Helper functions for common error patterns
impl ApexConfigError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ApexConfigError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ApexConfigError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
