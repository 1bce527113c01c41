//! Crate-wide error type
//!
//! Every fallible operation in the library returns [`LibraryResult`]. User-input failures
//! (bad search text, bad coordinates) are turned into a rejection message for the originating
//! connection; nothing here is fatal to the process.

use thiserror::Error;

/// Result alias used throughout the crate
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors raised by the codec, presence and transport layers
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("character {character:?} is not part of the page alphabet")]
    InvalidSymbol { character: char },

    #[error("text is {length} characters long but pages hold at most {max}")]
    LengthExceeded { length: usize, max: usize },

    #[error("text is {length} characters long but pages hold exactly {expected}")]
    LengthMismatch { length: usize, expected: usize },

    #[error("{field} is out of range (must be below {bound})")]
    OutOfRange { field: &'static str, bound: String },

    #[error("invalid coordinates: {input}")]
    MalformedCoordinates { input: String },

    #[error("search mode must be either \"fill\" or \"exact\" (got {mode:?})")]
    InvalidSearchMode { mode: String },

    #[error("invalid library geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("shuffle cipher failure: {message}")]
    Cipher { message: String },

    #[error("no connection with id {id}")]
    UnknownConnection { id: u32 },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("connection to {addr} failed: {error}")]
    ConnectionFailed { addr: String, error: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("report delivery failed: {message}")]
    ReportDelivery { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LibraryError {
    /// Errors caused by what a user typed, as opposed to broken invariants
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LibraryError::InvalidSymbol { .. }
                | LibraryError::LengthExceeded { .. }
                | LibraryError::LengthMismatch { .. }
                | LibraryError::MalformedCoordinates { .. }
                | LibraryError::InvalidSearchMode { .. }
        )
    }

    /// Shorthand for an [`LibraryError::OutOfRange`] with a printable bound
    pub fn out_of_range(field: &'static str, bound: impl std::fmt::Display) -> Self {
        LibraryError::OutOfRange {
            field,
            bound: bound.to_string(),
        }
    }
}

impl From<toml::de::Error> for LibraryError {
    fn from(error: toml::de::Error) -> Self {
        LibraryError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(error: serde_json::Error) -> Self {
        LibraryError::Config {
            message: error.to_string(),
        }
    }
}

impl From<notify::Error> for LibraryError {
    fn from(error: notify::Error) -> Self {
        LibraryError::Config {
            message: format!("file watcher: {}", error),
        }
    }
}
