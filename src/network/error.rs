//! Network-specific error handling
//!
//! Type alias and constructors for failures in the transport layer.

use crate::error::{LibraryError, LibraryResult};

/// Type alias for network-specific results
pub type NetworkResult<T> = LibraryResult<T>;

/// Create a connection error
pub fn connection_error(addr: &str, error: impl std::fmt::Display) -> LibraryError {
    LibraryError::ConnectionFailed {
        addr: addr.to_string(),
        error: error.to_string(),
    }
}

/// Create a protocol error
pub fn protocol_error(message: impl Into<String>) -> LibraryError {
    LibraryError::ProtocolError {
        message: message.into(),
    }
}
