//! Error types for ticket integrity operations.
//!
//! Provider failures surface as [`IntegrityError`]. The engines never
//! propagate them to gate staff or purchasers: check-in maps them to an
//! `INVALID` result and fraud screening fails open, both with logging.

use thiserror::Error;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, IntegrityError>;

/// Failure of a storage-backed provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The backing store rejected or failed the operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backing store could not be reached.
    #[error("Storage unavailable")]
    Unavailable,

    /// A transaction lost a race and was rolled back.
    #[error("Transaction conflict on {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// A caller supplied an unusable value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failure reported by a scanner's check-in callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The check-in service could not be reached.
    #[error("Check-in service unreachable: {0}")]
    Transport(String),

    /// The check-in service answered with an error.
    #[error("Check-in service error ({status}): {message}")]
    Service {
        /// HTTP status or equivalent code
        status: u16,
        /// Error message returned by the service
        message: String,
    },
}
