//! Core types and traits for bigset
//!
//! This crate defines the foundational types used throughout the system:
//! - SetName: Validated identifier of a named set
//! - KeyExtractor: Maps an element to its (key, payload) byte pair
//! - CancelToken: Cancellation flag and deadline accepted by every operation
//! - Error: Error type hierarchy
//! - Traits: Backing-store contract (SetBackend, SetTxn)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod key;
pub mod name;
pub mod traits;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use key::{Encoded, KeyExtractor, KeyFn};
pub use name::{NameError, SetName, QUOTE_CHAR, TABLE_PREFIX};
pub use traits::{SetBackend, SetTxn, WritePolicy};
