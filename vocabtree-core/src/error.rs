//! # Error Handling
//!
//! Error types for vocabulary tree construction and configuration.
//!
//! Matching itself never fails: a query without a match yields the invalid
//! match sentinel. Errors only surface when building from untrusted input
//! (parameters read from a config file, an empty candidate set) or when
//! loading configuration.

use thiserror::Error;

/// Result type alias for vocabtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for vocabtree
#[derive(Error, Debug)]
pub enum Error {
    // Construction Errors
    #[error("Invalid tree parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Candidate set is empty")]
    EmptyCandidateSet,

    #[error("Candidate set too large: {count} descriptors exceed the 32-bit index range")]
    CandidateSetTooLarge { count: usize },

    #[error("Forest needs at least one tree")]
    EmptyForest,

    // System Errors
    #[error("IO error: {message}")]
    Io { message: String, source: std::io::Error },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io { .. } => true,
            Error::Configuration { .. } => true,
            Error::Internal { .. } => false,
            _ => false,
        }
    }

    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidParameters { .. } => "INVALID_PARAMETERS",
            Error::EmptyCandidateSet => "EMPTY_CANDIDATE_SET",
            Error::CandidateSetTooLarge { .. } => "CANDIDATE_SET_TOO_LARGE",
            Error::EmptyForest => "EMPTY_FOREST",
            Error::Io { .. } => "IO_ERROR",
            Error::Configuration { .. } => "CONFIG_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Configuration {
            message: err.to_string(),
        }
    }
}
