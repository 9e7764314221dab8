//! Search path derivation.
//!
//! Three sources are layered in a fixed order: static paths derived from the
//! environment, well-known per-OS install roots, and caller-supplied paths.
//! The first two are computed once and cached until [`PathResolver::reset`].

use crate::host::Host;
use crate::platform::JDK_REGISTRY_KEYS;
use crate::{JdkPaths, Platform};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use xxhash_rust::xxh3::xxh3_64;

/// Environment variable naming a JDK home.
pub const JAVA_HOME_VAR: &str = "JAVA_HOME";

type PathCache = Arc<OnceCell<Vec<PathBuf>>>;

/// Sorted, duplicate-free set of directories to search.
///
/// # Example
///
/// ```rust
/// use jdk_discovery::SearchPathSet;
/// use std::path::PathBuf;
///
/// let set: SearchPathSet = ["/b", "/a", "/b"].into_iter().map(PathBuf::from).collect();
/// assert_eq!(set.as_slice(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SearchPathSet(Vec<PathBuf>);

impl SearchPathSet {
    /// The paths in ascending order.
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }

    /// Iterate over the paths in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `path` is in the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.0.binary_search_by(|p| p.as_path().cmp(path)).is_ok()
    }

    /// Stable digest of the set, identifying the search space a result set
    /// was built from.
    pub fn content_hash(&self) -> String {
        let mut bytes = Vec::new();
        for path in &self.0 {
            bytes.extend_from_slice(path.to_string_lossy().as_bytes());
            bytes.push(0);
        }
        format!("{:016x}", xxh3_64(&bytes))
    }
}

impl FromIterator<PathBuf> for SearchPathSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SearchPathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Derives the set of directories to search for JDKs.
///
/// Resolution is best-effort: an unreadable source contributes nothing and
/// [`resolve`](Self::resolve) never fails.
///
/// Concurrent first calls share a single computation of each cache.
pub struct PathResolver {
    host: Arc<dyn Host>,
    platform: Platform,
    static_paths: Mutex<PathCache>,
    platform_paths: Mutex<PathCache>,
}

impl PathResolver {
    /// Create a resolver with empty caches.
    pub fn new(host: Arc<dyn Host>, platform: Platform) -> Self {
        Self {
            host,
            platform,
            static_paths: Mutex::default(),
            platform_paths: Mutex::default(),
        }
    }

    /// Resolve the search paths for one detection request.
    pub async fn resolve(
        &self,
        extra_paths: Option<&JdkPaths>,
        skip_platform_paths: bool,
    ) -> SearchPathSet {
        let static_cache = current(&self.static_paths);
        let mut paths = static_cache
            .get_or_init(|| async { self.static_search_paths() })
            .await
            .clone();

        if !skip_platform_paths {
            let platform_cache = current(&self.platform_paths);
            let platform_paths = platform_cache
                .get_or_init(|| self.platform_search_paths())
                .await;
            paths.extend(platform_paths.iter().cloned());
        }

        if let Some(extra) = extra_paths {
            paths.extend(self.caller_paths(extra));
        }

        paths.into_iter().collect()
    }

    /// Discard the static and platform path caches.
    pub fn reset(&self) {
        for cache in [&self.static_paths, &self.platform_paths] {
            *cache.lock().unwrap_or_else(PoisonError::into_inner) = PathCache::default();
        }
    }

    /// JDK root of the `javac` on `PATH`, and `JAVA_HOME`.
    fn static_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // <root>/bin/javac
        if let Some(javac) = self.host.which("javac") {
            match self.host.realpath(&javac) {
                Ok(real) => {
                    if let Some(root) = real.parent().and_then(Path::parent) {
                        push_unique(&mut paths, root.to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        javac = %javac.display(),
                        error = %e,
                        "javac on PATH could not be resolved"
                    )
                }
            }
        }

        if let Some(home) = self.host.env_var(JAVA_HOME_VAR) {
            let home = PathBuf::from(home);
            if self.host.is_dir(&home) {
                if let Ok(real) = self.host.realpath(&home) {
                    push_unique(&mut paths, real);
                }
            } else {
                tracing::debug!(java_home = %home.display(), "JAVA_HOME is not a directory");
            }
        }

        tracing::debug!(?paths, "computed static search paths");
        paths
    }

    async fn platform_search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .platform
            .well_known_roots()
            .iter()
            .map(PathBuf::from)
            .collect();

        if self.platform.uses_registry() {
            for key in JDK_REGISTRY_KEYS {
                if let Some(home) = self.registry_java_home(key).await {
                    push_unique(&mut paths, home);
                }
            }
        }

        tracing::debug!(platform = %self.platform, ?paths, "computed platform search paths");
        paths
    }

    async fn registry_java_home(&self, key: &str) -> Option<PathBuf> {
        let current = self.host.registry_value(key, "CurrentVersion").await?;
        let version_key = format!(r"{key}\{current}");
        self.host
            .registry_value(&version_key, "JavaHome")
            .await
            .map(PathBuf::from)
    }

    /// Existing paths resolve to their real path and must be directories;
    /// missing ones pass through unchanged so they are found once created.
    fn caller_paths(&self, extra: &JdkPaths) -> Vec<PathBuf> {
        extra
            .iter()
            .filter_map(|path| match self.host.realpath(path) {
                Ok(real) if self.host.is_dir(&real) => Some(real),
                Ok(real) => {
                    tracing::debug!(path = %real.display(), "dropping non-directory search path");
                    None
                }
                Err(_) => Some(path.clone()),
            })
            .collect()
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("platform", &self.platform)
            .finish()
    }
}

fn current(cache: &Mutex<PathCache>) -> PathCache {
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}
