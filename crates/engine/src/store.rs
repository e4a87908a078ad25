//! SetStore struct and open/close logic
//!
//! ## Lifecycle
//!
//! A store is built once, with its key extractor and backing file fixed for
//! its whole life. Named sets are created by the first mutating call that
//! references them, never by reads. `close` consumes the store, so it cannot
//! be called twice or raced by calls on the same store.
//!
//! ## Name cache
//!
//! The store remembers which sets it has seen created. The cache is only
//! advisory: a failed mutation evicts its names, so the next call re-runs
//! `CREATE TABLE IF NOT EXISTS`.

use std::path::{Path, PathBuf};

use bigset_core::{CancelToken, Error, KeyExtractor, Result, SetBackend, SetName, SetTxn};
use bigset_storage::{BackingFile, SqliteBackend, StoreConfig};
use dashmap::DashSet;
use tracing::{debug, info, warn};

/// Default rows per page for lazy iteration over a custom backend
const DEFAULT_PAGE_SIZE: usize = 512;

/// Validate one set name
pub(crate) fn validate(name: &str) -> Result<SetName> {
    SetName::new(name).map_err(|reason| Error::invalid_name(name, reason))
}

/// Validate a target and its sources; the first invalid name aborts
pub(crate) fn validate_all<I>(target: &str, sources: I) -> Result<(SetName, Vec<SetName>)>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let target = validate(target)?;
    let sources = sources
        .into_iter()
        .map(|s| validate(s.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok((target, sources))
}

/// Many named sets of `T` in one backing store
///
/// # Example
///
/// ```ignore
/// use bigset::{CancelToken, SetStore};
///
/// let store = SetStore::<i64>::ephemeral()?;
/// let cancel = CancelToken::new();
///
/// store.add(&cancel, "foo", [1, 2, 3])?;
/// store.add(&cancel, "bar", [3, 4])?;
/// let inserted = store.union(&cancel, "all", ["foo", "bar"])?;
/// assert_eq!(inserted, 4);
///
/// store.close()?;
/// ```
pub struct SetStore<T, B: SetBackend = SqliteBackend> {
    backend: B,
    extractor: KeyExtractor<T>,
    initialized: DashSet<String>,
    page_size: usize,
}

impl<T> SetStore<T, SqliteBackend> {
    /// Builder for a SQLite-backed store
    pub fn builder() -> SetStoreBuilder<T> {
        SetStoreBuilder::new()
    }

    /// Store on a temporary file, deleted on close; identity keys
    pub fn ephemeral() -> Result<Self> {
        Self::builder().build()
    }

    /// Store on a persistent file at `path`; identity keys
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().path(path).build()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.backend.path()
    }

    /// Whether the backing file survives close
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Release the backing store, deleting it unless it is persistent
    pub fn close(self) -> Result<()> {
        let sets = self.initialized.len();
        self.backend.close()?;
        info!(target: "bigset::store", sets, "Closed set store");
        Ok(())
    }
}

impl<T, B: SetBackend> SetStore<T, B> {
    /// Store over an already opened backend
    pub fn with_backend(backend: B, extractor: KeyExtractor<T>) -> Self {
        Self {
            backend,
            extractor,
            initialized: DashSet::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// The backing store
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The key extractor shared by every set
    pub fn extractor(&self) -> &KeyExtractor<T> {
        &self.extractor
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of elements in `name`; 0 for a set never written
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidName` before touching the store if the name is
    /// invalid.
    pub fn cardinality(&self, cancel: &CancelToken, name: &str) -> Result<u64> {
        let set = validate(name)?;
        if !self.exists(cancel, &set)? {
            return Ok(0);
        }
        self.backend.count(cancel, &set)
    }

    /// Whether `name` has been created in the backing store
    pub fn contains(&self, cancel: &CancelToken, name: &str) -> Result<bool> {
        let set = validate(name)?;
        self.exists(cancel, &set)
    }

    pub(crate) fn exists(&self, cancel: &CancelToken, set: &SetName) -> Result<bool> {
        if self.initialized.contains(set.as_str()) {
            return Ok(true);
        }
        self.backend.table_exists(cancel, set)
    }

    /// Whether a source table exists, as seen by the open transaction
    pub(crate) fn source_exists(&self, txn: &mut dyn SetTxn, set: &SetName) -> Result<bool> {
        if self.initialized.contains(set.as_str()) {
            return Ok(true);
        }
        txn.table_exists(set)
    }

    /// Run `f` in one write transaction with `target` created if absent
    ///
    /// `f` receives whether the target existed before this call.
    pub(crate) fn write_set<R, F>(
        &self,
        cancel: &CancelToken,
        op: &'static str,
        target: &SetName,
        sources: &[SetName],
        f: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut dyn SetTxn, bool) -> Result<R>,
    {
        let cached = self.initialized.contains(target.as_str());
        let result = self.backend.write(cancel, |txn| {
            let existed = cached || txn.table_exists(target)?;
            if !existed {
                debug!(target: "bigset::store", set = %target, "Creating set");
                txn.create_table(target)?;
            }
            f(txn, existed)
        });
        match &result {
            Ok(_) => {
                if !cached {
                    self.initialized.insert(target.as_str().to_string());
                }
            }
            Err(e) => {
                let mut evicted = self.initialized.remove(target.as_str()).is_some();
                for source in sources {
                    evicted |= self.initialized.remove(source.as_str()).is_some();
                }
                if evicted {
                    warn!(
                        target: "bigset::store",
                        op,
                        set = %target,
                        error = %e,
                        "Operation failed; set names evicted from cache"
                    );
                } else {
                    debug!(target: "bigset::store", op, set = %target, error = %e, "Operation failed");
                }
            }
        }
        result
    }
}

/// Builder for a SQLite-backed [`SetStore`]
///
/// Every option is independent and optional; everything is resolved once
/// by [`build`](Self::build).
///
/// ```ignore
/// let store = SetStore::<Book>::builder()
///     .key_fn(|b: &Book| b.name.as_bytes().to_vec())
///     .path("/data/books.sqlite")
///     .build()?;
/// ```
pub struct SetStoreBuilder<T> {
    extractor: KeyExtractor<T>,
    path: Option<PathBuf>,
    config: StoreConfig,
}

impl<T> SetStoreBuilder<T> {
    /// Create new builder with defaults: identity keys, ephemeral file
    pub fn new() -> Self {
        Self {
            extractor: KeyExtractor::identity(),
            path: None,
            config: StoreConfig::default(),
        }
    }

    /// Identify elements by `key_fn` instead of their full serialization
    ///
    /// Elements with the same key are the same element for deduplication
    /// and conflict matching. The stored payload is still the full element.
    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&T) -> Vec<u8> + Send + Sync + 'static,
    {
        self.extractor = KeyExtractor::with_key_fn(key_fn);
        self
    }

    /// Use a prepared key extractor
    pub fn extractor(mut self, extractor: KeyExtractor<T>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Persist sets in the file at `path`
    ///
    /// The file is kept on close and reopened by later stores. Nothing
    /// checks that stored payloads still match `T`.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Backing store configuration
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the store
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or the backing
    /// file cannot be created or opened.
    pub fn build(self) -> Result<SetStore<T>> {
        self.config.validate()?;
        let file = match self.path {
            Some(path) => BackingFile::persistent(path),
            None => BackingFile::ephemeral()?,
        };
        let page_size = self.config.page_size;
        let backend = SqliteBackend::open(file, self.config)?;
        info!(
            target: "bigset::store",
            path = %backend.path().display(),
            persistent = backend.is_persistent(),
            custom_key = !self.extractor.is_identity(),
            "Opened set store"
        );
        let mut store = SetStore::with_backend(backend, self.extractor);
        store.page_size = page_size;
        Ok(store)
    }
}

impl<T> Default for SetStoreBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
