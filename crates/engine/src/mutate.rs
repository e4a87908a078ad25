//! Mutator: per-element writes against one set
//!
//! | Operation | Key present | Key absent | Counts |
//! |-----------|-------------|------------|--------|
//! | add       | keep        | insert     | inserts |
//! | supersede | overwrite   | insert     | every write, even an unchanged payload |
//! | refresh   | overwrite   | skip       | overwrites |
//! | discard   | delete      | skip       | deletes |
//!
//! A whole call is one transaction: if any element fails to encode, or the
//! call is cancelled, nothing it wrote is kept.

use std::borrow::Borrow;

use bigset_core::{CancelToken, Result, SetBackend, WritePolicy};
use serde::Serialize;
use tracing::debug;

use crate::store::{validate, SetStore};

/// What to do with each element's row
#[derive(Debug, Clone, Copy)]
enum RowOp {
    Write(WritePolicy),
    Delete,
}

impl<T: Serialize, B: SetBackend> SetStore<T, B> {
    /// Insert elements whose key is not yet in `name`
    ///
    /// Returns the number of elements actually inserted. Duplicates within
    /// `values` count once; the first occurrence is the one stored.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(store.add(&cancel, "foo", [10, 20, 10])?, 2);
    /// assert_eq!(store.add(&cancel, "foo", [10])?, 0);
    /// ```
    pub fn add<I>(&self, cancel: &CancelToken, name: &str, values: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        self.apply(cancel, "add", name, RowOp::Write(WritePolicy::InsertOrIgnore), values)
    }

    /// Insert elements, replacing stored elements with the same key
    ///
    /// Returns the number of rows written. An element whose stored payload
    /// is already identical still counts.
    pub fn supersede<I>(&self, cancel: &CancelToken, name: &str, values: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        self.apply(cancel, "supersede", name, RowOp::Write(WritePolicy::Upsert), values)
    }

    /// Replace stored elements with the same key; never insert
    ///
    /// Returns the number of elements updated.
    pub fn refresh<I>(&self, cancel: &CancelToken, name: &str, values: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        self.apply(
            cancel,
            "refresh",
            name,
            RowOp::Write(WritePolicy::UpdateExisting),
            values,
        )
    }

    /// Remove elements with the same key, if present
    ///
    /// Returns the number of elements actually removed.
    pub fn discard<I>(&self, cancel: &CancelToken, name: &str, values: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        self.apply(cancel, "discard", name, RowOp::Delete, values)
    }

    fn apply<I>(
        &self,
        cancel: &CancelToken,
        op: &'static str,
        name: &str,
        row_op: RowOp,
        values: I,
    ) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        let set = validate(name)?;
        let extractor = self.extractor();
        let affected = self.write_set(cancel, op, &set, &[], |txn, _| {
            let mut affected = 0;
            for value in values {
                cancel.check()?;
                let value = value.borrow();
                affected += match row_op {
                    RowOp::Write(policy) => {
                        let encoded = extractor.extract(value)?;
                        txn.write_row(&set, policy, encoded.key(), encoded.payload())?
                    }
                    RowOp::Delete => txn.delete_row(&set, &extractor.key_of(value)?)?,
                };
            }
            Ok(affected)
        })?;
        debug!(target: "bigset::store", op, set = %set, affected, "Applied");
        Ok(affected)
    }
}
