//! Backing-store contract
//!
//! This module defines the SetBackend and SetTxn traits that enable
//! swapping the storage engine without changing set semantics. The engine
//! only ever talks to the backing store through these primitives.
//!
//! Thread safety: `SetBackend` methods must be safe to call concurrently
//! from multiple threads (requires Send + Sync). Writes are serialized by
//! the backend; reads may run alongside them.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::name::SetName;

/// Conflict policy for a single-row write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePolicy {
    /// Insert; keep the existing row when the key is taken
    InsertOrIgnore,
    /// Insert; overwrite the existing row's payload when the key is taken
    Upsert,
    /// Overwrite the payload only when the key is present; never insert
    UpdateExisting,
}

/// Storage abstraction for named key/payload tables
///
/// # Examples
///
/// ```ignore
/// let inserted = backend.write(&cancel, |txn| {
///     txn.create_table(&name)?;
///     txn.write_row(&name, WritePolicy::InsertOrIgnore, b"k", b"v")
/// })?;
/// ```
pub trait SetBackend: Send + Sync {
    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. A fired
    /// cancellation token aborts the in-flight statement.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, `Error::Cancelled`, or a storage error
    /// from begin/commit.
    fn write<R, F>(&self, cancel: &CancelToken, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn SetTxn) -> Result<R>;

    /// Whether the table backing `name` exists
    fn table_exists(&self, cancel: &CancelToken, name: &SetName) -> Result<bool>;

    /// Number of rows in `name`; the table must exist
    fn count(&self, cancel: &CancelToken, name: &SetName) -> Result<u64>;

    /// Payload stored under `key`, if any; the table must exist
    fn lookup(&self, cancel: &CancelToken, name: &SetName, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Forward-only cursor over every payload of `name`
    ///
    /// `visit` borrows each payload only for the duration of the call.
    /// Returns the number of rows visited.
    fn scan(
        &self,
        cancel: &CancelToken,
        name: &SetName,
        visit: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<u64>;

    /// Up to `limit` (row id, payload) pairs with row id greater than `after`,
    /// in row id order
    fn scan_page(
        &self,
        cancel: &CancelToken,
        name: &SetName,
        after: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Vec<u8>)>>;
}

/// Statements available inside a write transaction
///
/// Every method returns the number of rows the statement affected.
pub trait SetTxn {
    /// `CREATE TABLE IF NOT EXISTS` for a key-unique table
    fn create_table(&mut self, name: &SetName) -> Result<()>;

    /// Whether the table backing `name` exists, as seen by this transaction
    fn table_exists(&mut self, name: &SetName) -> Result<bool>;

    /// Write one row under `policy`
    fn write_row(
        &mut self,
        name: &SetName,
        policy: WritePolicy,
        key: &[u8],
        payload: &[u8],
    ) -> Result<u64>;

    /// Delete the row with `key`
    fn delete_row(&mut self, name: &SetName, key: &[u8]) -> Result<u64>;

    /// Copy every row of `source` into `target`, keeping existing target rows
    fn insert_from(&mut self, target: &SetName, source: &SetName) -> Result<u64>;

    /// Insert into `target` the keys present in every source, with the first
    /// source's payload, keeping existing target rows
    fn insert_intersection(&mut self, target: &SetName, sources: &[SetName]) -> Result<u64>;

    /// Delete the rows of `target` whose key is present in `source`
    fn delete_matching(&mut self, target: &SetName, source: &SetName) -> Result<u64>;
}
