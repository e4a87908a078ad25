//! bigset Comprehensive Test Suite
//!
//! End-to-end coverage of the public API through the `bigset` facade.
//!
//! ## Modules
//!
//! - `basic_flow`: add, discard and set algebra on integer sets
//! - `key_function`: custom identities (refresh, supersede, dedup)
//! - `structs`: struct elements, visitors and lookups
//! - `persistence`: persistent and ephemeral backing files
//! - `cancellation`: cancel tokens, deadlines and atomicity
//! - `names`: name validation at every entry point
//! - `concurrency`: shared stores across threads
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test bigset_comprehensive
//!
//! # Run one module
//! cargo test --test bigset_comprehensive key_function::
//!
//! # Show log output
//! RUST_LOG=bigset=debug cargo test --test bigset_comprehensive -- --nocapture
//! ```

use bigset::{CancelToken, SetStore};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// A book; two books with the same name are often the "same" book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub name: String,
    pub pages: u32,
    pub favourite: bool,
}

/// Book with only a name and page count
pub fn book(name: &str, pages: u32) -> Book {
    Book {
        name: name.to_string(),
        pages,
        favourite: false,
    }
}

/// Identity of a book is its name
pub fn by_name(b: &Book) -> Vec<u8> {
    b.name.as_bytes().to_vec()
}

/// Ephemeral integer store and a fresh token
pub fn int_store() -> (SetStore<i64>, CancelToken) {
    (SetStore::ephemeral().unwrap(), CancelToken::new())
}

/// Elements of `name`, sorted
pub fn sorted(store: &SetStore<i64>, cancel: &CancelToken, name: &str) -> Vec<i64> {
    let mut values = store.get(cancel, name).unwrap();
    values.sort();
    values
}

/// Route library logs to this test's output, honoring `RUST_LOG`
///
/// The subscriber is only installed for the current thread while the guard
/// lives, so tests do not fight over a global default.
pub fn init_test_subscriber() -> tracing::subscriber::DefaultGuard {
    let fmt_layer = fmt::layer().with_target(true).with_test_writer();
    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .set_default()
}

mod basic_flow;
mod concurrency;
mod key_function;
