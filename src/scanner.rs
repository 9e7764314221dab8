//! The scan engine: walks search roots, validates candidates, and keeps a
//! live result cache per search space.
//!
//! Detection talks to the engine through the [`Scanner`] trait.
//! [`CachingScanner`] is the implementation used by default.

use crate::host::Host;
use crate::platform::BUNDLE_HOME;
use crate::{DetectError, JdkInfo, Result};
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// A directory predicate that yields JDK metadata.
pub trait Validate: Send + Sync + 'static {
    /// Validate `dir`; `None` means it is not a JDK.
    fn validate<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Option<JdkInfo>>;
}

/// JDKs found in one search space, keyed by [`JdkInfo::key`].
///
/// At most one JDK is kept per identity key. When several directories share
/// a key, the one with the smallest path is reported and the others stand in
/// for it once it stops validating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    hash: String,
    entries: BTreeMap<String, JdkInfo>,
    scanned_at: SystemTime,
    #[serde(skip)]
    found: BTreeMap<PathBuf, JdkInfo>,
}

impl ResultSet {
    fn new(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            entries: BTreeMap::new(),
            scanned_at: SystemTime::now(),
            found: BTreeMap::new(),
        }
    }

    /// Recompute the keyed entries from every validated directory.
    fn rebuild_entries(&mut self) {
        self.entries.clear();
        for info in self.found.values() {
            self.entries
                .entry(info.key())
                .or_insert_with(|| info.clone());
        }
    }

    /// Content hash of the search space these results belong to.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// When a scan last touched these results.
    pub fn scanned_at(&self) -> SystemTime {
        self.scanned_at
    }

    /// The JDK with the given identity key.
    pub fn get(&self, key: &str) -> Option<&JdkInfo> {
        self.entries.get(key)
    }

    /// Number of JDKs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no JDK was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, jdk)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JdkInfo)> {
        self.entries.iter()
    }

    /// The JDK with the highest version, ignoring unversioned ones.
    pub fn newest(&self) -> Option<&JdkInfo> {
        self.entries
            .values()
            .filter_map(|info| info.parsed_version().map(|v| (v, info)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, info)| info)
    }

    /// Borrow the plain key → JDK map.
    pub fn entries(&self) -> &BTreeMap<String, JdkInfo> {
        &self.entries
    }

    /// Plain-data projection: the key → JDK map without engine metadata.
    pub fn into_entries(self) -> BTreeMap<String, JdkInfo> {
        self.entries
    }
}

/// One scan of a search space.
#[derive(Clone)]
pub struct ScanRequest<'a> {
    /// Search roots to scan. For a partial re-scan, a subset of the roots
    /// the hash was computed from.
    pub paths: &'a [PathBuf],
    /// Identifies the result set to read from and merge into.
    pub hash: &'a str,
    /// Scan even if results for `hash` are cached.
    pub force: bool,
    /// Predicate applied to every candidate directory.
    pub validator: Arc<dyn Validate>,
    /// Caller-chosen tag echoed in the resulting [`ScanUpdate`].
    pub origin: Option<u64>,
}

/// Broadcast whenever a scan changes the JDKs of a result set.
#[derive(Debug, Clone)]
pub struct ScanUpdate {
    /// The result set after the scan.
    pub results: ResultSet,
    /// The [`ScanRequest::origin`] of the scan that caused the change.
    pub origin: Option<u64>,
}

/// The scan engine capability consumed by detection.
pub trait Scanner: Send + Sync + 'static {
    /// Scan the requested roots and return the merged result set.
    fn scan<'a>(&'a self, request: ScanRequest<'a>) -> BoxFuture<'a, Result<ResultSet>>;

    /// Subscribe to result set changes.
    fn subscribe(&self) -> broadcast::Receiver<ScanUpdate>;

    /// Forget all cached results.
    fn reset_cache(&self);
}

type SharedValidation = Shared<BoxFuture<'static, Option<JdkInfo>>>;

/// [`Scanner`] that caches results per search space.
///
/// # Scan Process
///
/// 1. Return the cached result set for the hash unless `force` is set
/// 2. Collect candidates: each existing root and its direct subdirectories
/// 3. Validate candidates concurrently; a directory already being validated
///    by another scan is awaited rather than validated twice
/// 4. Drop cached entries backed by the scanned roots, merge the fresh ones,
///    and broadcast a [`ScanUpdate`] if the JDKs changed
pub struct CachingScanner {
    host: Arc<dyn Host>,
    results: Mutex<HashMap<String, ResultSet>>,
    in_flight: Arc<Mutex<HashMap<PathBuf, SharedValidation>>>,
    updates: broadcast::Sender<ScanUpdate>,
}

impl CachingScanner {
    /// Create a scanner with an empty cache.
    pub fn new(host: Arc<dyn Host>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            host,
            results: Mutex::default(),
            in_flight: Arc::default(),
            updates,
        }
    }

    fn candidates(&self, roots: &[PathBuf]) -> Result<BTreeSet<PathBuf>> {
        let mut candidates = BTreeSet::new();
        for root in roots {
            if !self.host.is_dir(root) {
                tracing::trace!(root = %root.display(), "search root does not exist");
                continue;
            }
            candidates.insert(root.clone());

            let entries = self.host.read_dir(root).map_err(|source| DetectError::Scan {
                path: root.clone(),
                source,
            })?;
            candidates.extend(entries.into_iter().filter(|entry| self.host.is_dir(entry)));
        }
        Ok(candidates)
    }

    fn validate_once(&self, dir: &Path, validator: &Arc<dyn Validate>) -> SharedValidation {
        let mut in_flight = lock(&self.in_flight);
        if let Some(pending) = in_flight.get(dir) {
            return pending.clone();
        }

        let validator = Arc::clone(validator);
        let registry = Arc::clone(&self.in_flight);
        let owned = dir.to_path_buf();
        let validation = async move {
            let result = validator.validate(&owned).await;
            lock(&registry).remove(&owned);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(dir.to_path_buf(), validation.clone());
        validation
    }

    fn merge(&self, hash: &str, roots: &[PathBuf], fresh: Vec<JdkInfo>) -> (ResultSet, bool) {
        let mut cache = lock(&self.results);
        let previous = cache.get(hash);

        let mut results = previous.cloned().unwrap_or_else(|| ResultSet::new(hash));
        results
            .found
            .retain(|path, _| !roots.iter().any(|root| is_backed_by(path, root)));
        results
            .found
            .extend(fresh.into_iter().map(|info| (info.path.clone(), info)));
        results.rebuild_entries();
        results.scanned_at = SystemTime::now();

        let changed = !matches!(previous, Some(p) if p.entries == results.entries);
        cache.insert(hash.to_string(), results.clone());
        (results, changed)
    }
}

impl Scanner for CachingScanner {
    fn scan<'a>(&'a self, request: ScanRequest<'a>) -> BoxFuture<'a, Result<ResultSet>> {
        async move {
            if !request.force {
                let cached = lock(&self.results).get(request.hash).cloned();
                if let Some(cached) = cached {
                    return Ok(cached);
                }
            }

            let candidates = self.candidates(request.paths)?;
            tracing::debug!(
                hash = request.hash,
                roots = request.paths.len(),
                candidates = candidates.len(),
                "scanning for JDKs"
            );

            let validations = candidates
                .iter()
                .map(|dir| self.validate_once(dir, &request.validator));

            let fresh: Vec<JdkInfo> = join_all(validations).await.into_iter().flatten().collect();

            let (results, changed) = self.merge(request.hash, request.paths, fresh);
            if changed {
                tracing::debug!(hash = request.hash, jdks = results.len(), "result set changed");
                // No subscribers is fine.
                let _ = self.updates.send(ScanUpdate {
                    results: results.clone(),
                    origin: request.origin,
                });
            }
            Ok(results)
        }
        .boxed()
    }

    fn subscribe(&self) -> broadcast::Receiver<ScanUpdate> {
        self.updates.subscribe()
    }

    fn reset_cache(&self) {
        lock(&self.results).clear();
    }
}

impl std::fmt::Debug for CachingScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingScanner")
            .field("cached", &lock(&self.results).len())
            .finish()
    }
}

/// Whether a JDK at `path` would be found by scanning `root`: it is the root
/// or a direct child, possibly through a bundle's `Contents/Home`.
fn is_backed_by(path: &Path, root: &Path) -> bool {
    let candidate = if path.ends_with(BUNDLE_HOME) {
        path.parent().and_then(Path::parent).unwrap_or(path)
    } else {
        path
    };
    candidate
        .strip_prefix(root)
        .is_ok_and(|rest| rest.components().count() <= 1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
