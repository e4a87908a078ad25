//! Set engine for bigset
//!
//! This crate turns the backing store into named sets:
//! - SetStore: Main store struct with open/close and the name cache
//! - Mutator: add, supersede, refresh, discard
//! - SetAlgebra: union, intersection, subtract
//! - Reader: each, all, get, retrieve_if_exists
//!
//! Every call validates its names first, then runs in exactly one
//! backing-store transaction.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod algebra;
mod mutate;
pub mod reader;
pub mod store;

pub use reader::SetIter;
pub use store::{SetStore, SetStoreBuilder};
