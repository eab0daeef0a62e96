use thiserror::Error;

/// Core error types for Keel configuration handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid manifest name: {0}")]
    InvalidManifestName(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Unknown engine mode: {0}")]
    InvalidEngineMode(String),

    #[error("Duplicate manifest: {0}")]
    DuplicateManifest(String),

    #[error("Invalid target in manifest {manifest}: {message}")]
    InvalidTarget { manifest: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidManifestName error
    pub fn invalid_manifest_name(name: impl Into<String>) -> Self {
        Self::InvalidManifestName(name.into())
    }

    /// Create a new InvalidName error
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    /// Create a new InvalidEngineMode error
    pub fn invalid_engine_mode(mode: impl Into<String>) -> Self {
        Self::InvalidEngineMode(mode.into())
    }

    /// Create a new DuplicateManifest error
    pub fn duplicate_manifest(name: impl Into<String>) -> Self {
        Self::DuplicateManifest(name.into())
    }

    /// Create a new InvalidTarget error
    pub fn invalid_target(manifest: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            manifest: manifest.into(),
            message: message.into(),
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidManifestName(_)
            | Self::InvalidName(_)
            | Self::InvalidEngineMode(_)
            | Self::InvalidTarget { .. } => ErrorCategory::Validation,
            Self::DuplicateManifest(_) => ErrorCategory::Conflict,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
