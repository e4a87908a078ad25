//! Error types for bigset
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::name::NameError;
use std::io;
use thiserror::Error;

/// Result type alias for bigset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error carried from a collaborator or a caller-supplied visitor
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for bigset
///
/// | Category | Variants |
/// |----------|----------|
/// | Validation | `InvalidName`, `InvalidConfig` |
/// | Encoding | `Encoding`, `Decoding` |
/// | Backing store | `Storage`, `Io` |
/// | Control | `Cancelled`, `Visitor` |
#[derive(Debug, Error)]
pub enum Error {
    /// A set name was rejected before touching the backing store
    #[error("{name:?} is not an allowable set name: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: NameError,
    },

    /// An element could not be serialized into its key or payload
    #[error("Encoding error: {0}")]
    Encoding(#[source] serde_json::Error),

    /// A stored payload could not be deserialized into the element type
    #[error("Decoding error: {0}")]
    Decoding(#[source] serde_json::Error),

    /// Failure surfaced by the backing store
    #[error("Storage error ({context}): {source}")]
    Storage {
        /// Operation and set the failure happened in
        context: String,
        /// The backing store's error, unchanged
        #[source]
        source: BoxError,
    },

    /// The cancellation token fired or its deadline passed
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error (backing file lifecycle)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A visitor passed to `each` failed; iteration stopped
    #[error("Visitor failed: {0}")]
    Visitor(#[source] BoxError),
}

impl Error {
    /// Build an `InvalidName` error
    pub fn invalid_name(name: impl Into<String>, reason: NameError) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Wrap a backing store error with call context
    pub fn storage(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wrap a visitor's own error
    pub fn visitor(source: impl Into<BoxError>) -> Self {
        Error::Visitor(source.into())
    }

    /// Build an `InvalidConfig` error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Whether this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidName { .. })
    }

    /// Whether this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
