//! Reader: streaming visits, lazy iteration and point lookups
//!
//! Reads never create a set: a set that was never written reads as empty.
//! The element count is sampled before iterating; if concurrent writers
//! change the set meanwhile, the difference is logged, not raised.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use bigset_core::key::{decode, decode_into};
use bigset_core::{CancelToken, Error, Result, SetBackend, SetName};
use bigset_storage::SqliteBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::store::{validate, SetStore};

fn warn_on_drift(op: &'static str, set: &SetName, expected: u64, actual: u64) {
    if expected != actual {
        warn!(
            target: "bigset::reader",
            op,
            set = %set,
            expected,
            actual,
            "Set has changed during read, potentially resulting in less efficient memory usage"
        );
    }
}

impl<T: DeserializeOwned, B: SetBackend> SetStore<T, B> {
    /// Visit every element of `name` in one forward pass
    ///
    /// Each payload is decoded into `buffer` in place, then `visit` is called
    /// with it. Allocations already held by `buffer` are reused when `T`
    /// supports in-place decoding (`Vec`, `String`, derived structs). The
    /// first error, from decoding or from `visit`, stops the pass and is
    /// returned. Wrap the visitor's own failures with [`Error::visitor`].
    ///
    /// The visitor may call back into the store, including writes to other
    /// sets.
    pub fn each<F>(&self, cancel: &CancelToken, name: &str, buffer: &mut T, mut visit: F) -> Result<()>
    where
        F: FnMut(&T) -> Result<()>,
    {
        let set = validate(name)?;
        if !self.exists(cancel, &set)? {
            return Ok(());
        }
        let expected = self.backend().count(cancel, &set)?;
        let visited = self.backend().scan(cancel, &set, &mut |payload| {
            decode_into(payload, buffer)?;
            visit(&*buffer)
        })?;
        debug!(target: "bigset::reader", set = %set, visited, "Visited set");
        warn_on_drift("each", &set, expected, visited);
        Ok(())
    }

    /// Lazy iterator over the elements of `name`
    ///
    /// Rows are fetched a page at a time, so memory stays bounded by the
    /// page size. The iterator is single-pass and fuses after yielding an
    /// error. An invalid name is reported as the first item.
    pub fn all(&self, cancel: &CancelToken, name: &str) -> SetIter<'_, T, B> {
        let start = validate(name).and_then(|set| {
            if !self.exists(cancel, &set)? {
                return Ok(None);
            }
            let expected = self.backend().count(cancel, &set)?;
            Ok(Some((set, expected)))
        });
        let (state, expected) = match start {
            Ok(Some((set, expected))) => (IterState::Reading(set), expected),
            Ok(None) => (IterState::Done, 0),
            Err(e) => (IterState::Failed(e), 0),
        };
        SetIter {
            store: self,
            cancel: cancel.clone(),
            state,
            expected,
            produced: 0,
            after: 0,
            page: VecDeque::new(),
        }
    }

    /// Every element of `name`, materialized
    pub fn get(&self, cancel: &CancelToken, name: &str) -> Result<Vec<T>> {
        let iter = self.all(cancel, name);
        let mut out = Vec::with_capacity(iter.expected_len() as usize);
        for value in iter {
            out.push(value?);
        }
        Ok(out)
    }
}

impl<T: Serialize + DeserializeOwned, B: SetBackend> SetStore<T, B> {
    /// The stored element sharing `like`'s key, if any
    ///
    /// With a custom key function the stored element may differ from
    /// `like` in every attribute but its key.
    pub fn retrieve_if_exists(&self, cancel: &CancelToken, name: &str, like: &T) -> Result<Option<T>> {
        let set = validate(name)?;
        if !self.exists(cancel, &set)? {
            return Ok(None);
        }
        let key = self.extractor().key_of(like)?;
        match self.backend().lookup(cancel, &set, &key)? {
            Some(payload) => decode(&payload).map(Some),
            None => Ok(None),
        }
    }
}

enum IterState {
    Reading(SetName),
    Failed(Error),
    Done,
}

/// Lazy, single-pass iterator returned by [`SetStore::all`]
pub struct SetIter<'a, T, B: SetBackend = SqliteBackend> {
    store: &'a SetStore<T, B>,
    cancel: CancelToken,
    state: IterState,
    expected: u64,
    produced: u64,
    /// Row id of the last fetched row
    after: i64,
    page: VecDeque<Vec<u8>>,
}

impl<T, B: SetBackend> SetIter<'_, T, B> {
    /// Element count sampled when the iterator was created
    pub fn expected_len(&self) -> u64 {
        self.expected
    }

    fn fail(&mut self, e: Error) -> Option<Result<T>> {
        self.state = IterState::Done;
        self.page.clear();
        Some(Err(e))
    }
}

impl<T: DeserializeOwned, B: SetBackend> Iterator for SetIter<'_, T, B> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let set = match std::mem::replace(&mut self.state, IterState::Done) {
            IterState::Reading(set) => set,
            IterState::Failed(e) => return Some(Err(e)),
            IterState::Done => return None,
        };

        if self.page.is_empty() {
            let fetched = self.store.backend().scan_page(
                &self.cancel,
                &set,
                self.after,
                self.store.page_size(),
            );
            let rows = match fetched {
                Ok(rows) => rows,
                Err(e) => return self.fail(e),
            };
            let Some(&(last, _)) = rows.last() else {
                warn_on_drift("all", &set, self.expected, self.produced);
                return None;
            };
            self.after = last;
            self.page.extend(rows.into_iter().map(|(_, payload)| payload));
        }

        let payload = self.page.pop_front()?;
        match decode(&payload) {
            Ok(value) => {
                self.produced += 1;
                self.state = IterState::Reading(set);
                Some(Ok(value))
            }
            Err(e) => self.fail(e),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            IterState::Reading(_) => (self.page.len(), None),
            IterState::Failed(_) => (1, Some(1)),
            IterState::Done => (0, Some(0)),
        }
    }
}

impl<T: DeserializeOwned, B: SetBackend> FusedIterator for SetIter<'_, T, B> {}
