//! bigset - Disk-resident named sets with set algebra
//!
//! A store manages many named sets of one element type `T`. Elements are
//! serialized and kept in a SQLite file, so sets can grow far beyond memory.
//! Every element has a key: by default its full serialization, or whatever a
//! custom key function derives from it.
//!
//! # Quick Start
//!
//! ```ignore
//! use bigset::{CancelToken, SetStore};
//!
//! // Temporary backing file, deleted on close
//! let store = SetStore::<i64>::ephemeral()?;
//! let cancel = CancelToken::new();
//!
//! store.add(&cancel, "fives", (0..100).map(|i| i * 5))?;
//! store.add(&cancel, "sevens", (0..100).map(|i| i * 7))?;
//! let common = store.intersection(&cancel, "both", ["fives", "sevens"])?;
//!
//! for value in store.all(&cancel, "both") {
//!     println!("{}", value?);
//! }
//! store.close()?;
//! ```
//!
//! # Architecture
//!
//! - `bigset-core`: names, key extraction, cancellation, errors, and the
//!   backing-store traits
//! - `bigset-storage`: the SQLite backing store and its configuration
//! - `bigset-engine`: [`SetStore`] and its operations
//!
//! Every operation takes a [`CancelToken`] and runs as one transaction.

pub use bigset_core::{
    CancelToken, Encoded, Error, KeyExtractor, KeyFn, NameError, Result, SetBackend, SetName,
    SetTxn, WritePolicy,
};
pub use bigset_engine::{SetIter, SetStore, SetStoreBuilder};
pub use bigset_storage::{BackingFile, SqliteBackend, StoreConfig, Synchronous, MAX_PAGE_SIZE};
