//! Set algebra: union, intersection and subtract into a target set
//!
//! Each operation validates every name first, then runs as one write
//! transaction. Results merge into the target; they never replace it.

use bigset_core::{CancelToken, Result, SetBackend};
use tracing::debug;

use crate::store::{validate_all, SetStore};

impl<T, B: SetBackend> SetStore<T, B> {
    /// Insert into `target` every element of `sources` it lacks
    ///
    /// Sources are merged in the order given; when several hold the same key,
    /// the element of the first such source wins. Elements already in
    /// `target` are never replaced. Sources that were never created are
    /// skipped. Returns the number of elements inserted.
    pub fn union<I>(&self, cancel: &CancelToken, target: &str, sources: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let (target, sources) = validate_all(target, sources)?;
        let inserted = self.write_set(cancel, "union", &target, &sources, |txn, _| {
            let mut inserted = 0;
            for source in &sources {
                if !self.source_exists(txn, source)? {
                    continue;
                }
                inserted += txn.insert_from(&target, source)?;
            }
            Ok(inserted)
        })?;
        debug!(target: "bigset::store", set = %target, sources = sources.len(), inserted, "Union");
        Ok(inserted)
    }

    /// Insert into `target` the elements whose key is in every source
    ///
    /// The stored element is the one from the first source. With no sources,
    /// or with any source never created, nothing is inserted. Returns the
    /// number of elements inserted.
    pub fn intersection<I>(&self, cancel: &CancelToken, target: &str, sources: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let (target, sources) = validate_all(target, sources)?;
        let inserted = self.write_set(cancel, "intersection", &target, &sources, |txn, _| {
            if sources.is_empty() {
                return Ok(0);
            }
            for source in &sources {
                if !self.source_exists(txn, source)? {
                    debug!(target: "bigset::store", set = %source, "Intersection source missing");
                    return Ok(0);
                }
            }
            txn.insert_intersection(&target, &sources)
        })?;
        debug!(
            target: "bigset::store",
            set = %target,
            sources = sources.len(),
            inserted,
            "Intersection"
        );
        Ok(inserted)
    }

    /// Remove from `target` every element whose key is in any source
    ///
    /// Returns the number of elements removed. A target never written is
    /// created empty.
    pub fn subtract<I>(&self, cancel: &CancelToken, target: &str, sources: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let (target, sources) = validate_all(target, sources)?;
        let removed = self.write_set(cancel, "subtract", &target, &sources, |txn, existed| {
            if !existed {
                return Ok(0);
            }
            let mut removed = 0;
            for source in &sources {
                if !self.source_exists(txn, source)? {
                    continue;
                }
                removed += txn.delete_matching(&target, source)?;
            }
            Ok(removed)
        })?;
        debug!(target: "bigset::store", set = %target, sources = sources.len(), removed, "Subtract");
        Ok(removed)
    }
}
