//! Error types for mindcord operations.
//!
//! The engine distinguishes three operational failure classes that callers
//! handle differently: storage failures (skip the write, keep going),
//! generation failures (fall back to a heuristic or canned reply) and
//! delivery failures (drop silently on background paths). Everything else is
//! a configuration or input problem.

use thiserror::Error;

/// Result type alias for mindcord operations.
pub type MindcordResult<T> = Result<T, MindcordError>;

/// Main error type for all mindcord operations.
#[derive(Error, Debug)]
pub enum MindcordError {
    /// The persistence backend could not be read or written.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external generation service failed or timed out.
    #[error("Generation error: {message}")]
    Generation {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Sending to a channel failed.
    #[error("Delivery error: {message}")]
    Delivery {
        message: String,
        code: ErrorCode,
        channel_id: Option<String>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// A requested record does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (STORE_xxx)
    StoreReadFailed,
    StoreWriteFailed,
    StoreCorrupted,

    // Generation (GEN_xxx)
    GenRequestFailed,
    GenTimeout,
    GenEmptyResponse,

    // Delivery (DLV_xxx)
    DlvSendFailed,
    DlvChannelUnavailable,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValOutOfRange,

    // Lookup (NF_xxx)
    NfUser,
    NfVenue,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StoreReadFailed => "STORE_001",
            ErrorCode::StoreWriteFailed => "STORE_002",
            ErrorCode::StoreCorrupted => "STORE_003",
            ErrorCode::GenRequestFailed => "GEN_001",
            ErrorCode::GenTimeout => "GEN_002",
            ErrorCode::GenEmptyResponse => "GEN_003",
            ErrorCode::DlvSendFailed => "DLV_001",
            ErrorCode::DlvChannelUnavailable => "DLV_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValOutOfRange => "VAL_002",
            ErrorCode::NfUser => "NF_001",
            ErrorCode::NfVenue => "NF_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl MindcordError {
    /// Create a storage read error.
    pub fn storage_read(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            code: ErrorCode::StoreReadFailed,
            source: None,
        }
    }

    /// Create a storage write error.
    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            code: ErrorCode::StoreWriteFailed,
            source: None,
        }
    }

    /// Create an error for a stored record that no longer decodes.
    pub fn storage_corrupted(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            code: ErrorCode::StoreCorrupted,
            source: None,
        }
    }

    /// Create a generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            code: ErrorCode::GenRequestFailed,
            source: None,
        }
    }

    /// Create a generation timeout error.
    pub fn generation_timeout(after: std::time::Duration) -> Self {
        Self::Generation {
            message: format!("generation did not complete within {}ms", after.as_millis()),
            code: ErrorCode::GenTimeout,
            source: None,
        }
    }

    /// Create a delivery error for a channel.
    pub fn delivery(channel_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            code: ErrorCode::DlvSendFailed,
            channel_id: Some(channel_id.into()),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValOutOfRange,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a user-not-found error.
    pub fn user_not_found(user_id: impl AsRef<str>) -> Self {
        Self::NotFound {
            message: format!("no profile for user '{}'", user_id.as_ref()),
            code: ErrorCode::NfUser,
        }
    }

    /// Create a venue-not-found error.
    pub fn venue_not_found(venue_id: impl AsRef<str>) -> Self {
        Self::NotFound {
            message: format!("no profile for venue '{}'", venue_id.as_ref()),
            code: ErrorCode::NfVenue,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::StorageUnavailable { code, .. } => *code,
            Self::Generation { code, .. } => *code,
            Self::Delivery { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::StoreCorrupted,
            Self::Io(_) => ErrorCode::StoreReadFailed,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this is a storage failure (skip the write, continue).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Io(_))
    }

    /// Whether this is a generation failure (use the fallback path).
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }

    /// Whether this is a delivery failure.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::StorageUnavailable { .. } => Some("Check that the data directory is writable"),
            Self::Generation { .. } => Some("Check the generation provider configuration"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for MindcordError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageUnavailable {
            message: err.to_string(),
            code: ErrorCode::StoreWriteFailed,
            source: Some(Box::new(err)),
        }
    }
}
