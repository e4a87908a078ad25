//! Storage layer for bigset
//!
//! This crate implements the backing store behind named sets:
//! - SqliteBackend: one SQLite file, one table per named set
//! - StoreConfig: tunables loadable from TOML
//!
//! # Concurrency
//!
//! The database runs in WAL journal mode. A single writer connection
//! serializes transactions; reader connections come from a small pool so
//! reads proceed alongside writes and can be re-entered from a visitor.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod sqlite;

pub use config::{StoreConfig, Synchronous, MAX_PAGE_SIZE};
pub use sqlite::{BackingFile, SqliteBackend};
