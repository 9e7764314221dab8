//! JDK detection functions.

use crate::detection::{JdkValidator, PathResolver, SearchPathSet};
use crate::host::{Host, SystemHost};
use crate::scanner::{CachingScanner, ResultSet, ScanRequest, Scanner, Validate};
use crate::watch::{self, WatchHandle, WatchSession};
use crate::{DetectOptions, JdkInfo, Platform, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

static DEFAULT_DETECTOR: LazyLock<JdkDetector> = LazyLock::new(JdkDetector::new);

/// Result of a detection.
///
/// Which variant is returned depends on [`DetectOptions::native`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Detection {
    /// The scanner's result set, with its hash and scan time.
    Native(ResultSet),
    /// Plain map of identity key to JDK.
    Plain(BTreeMap<String, JdkInfo>),
}

impl Detection {
    pub(crate) fn from_results(results: ResultSet, native: bool) -> Self {
        if native {
            Self::Native(results)
        } else {
            Self::Plain(results.into_entries())
        }
    }

    /// The detected JDKs by identity key, whichever the variant.
    pub fn entries(&self) -> &BTreeMap<String, JdkInfo> {
        match self {
            Self::Native(results) => results.entries(),
            Self::Plain(entries) => entries,
        }
    }

    /// Number of detected JDKs.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no JDK was detected.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Plain map of identity key to JDK.
    pub fn into_entries(self) -> BTreeMap<String, JdkInfo> {
        match self {
            Self::Native(results) => results.into_entries(),
            Self::Plain(entries) => entries,
        }
    }
}

/// Detects JDKs and owns the caches that make repeated detection cheap.
///
/// The free functions [`detect`], [`watch`] and [`reset`] use a process-wide
/// detector built with [`JdkDetector::new`]. Construct your own to use a
/// different [`Host`], [`Scanner`] or [`Platform`], or to keep caches apart.
///
/// # Example
///
/// ```rust,no_run
/// use jdk_discovery::{DetectOptions, JdkDetector};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let detector = JdkDetector::new();
///     let found = detector.detect(DetectOptions::default()).await.unwrap();
///     for (key, jdk) in found.entries() {
///         println!("{key}: {}", jdk.path.display());
///     }
/// }
/// ```
pub struct JdkDetector {
    host: Arc<dyn Host>,
    resolver: PathResolver,
    validator: Arc<JdkValidator>,
    scanner: Arc<dyn Scanner>,
}

impl JdkDetector {
    /// Detector for the real system and the current platform.
    pub fn new() -> Self {
        Self::with_host(Arc::new(SystemHost), Platform::current())
    }

    /// Detector using `host` and the given platform conventions, with a
    /// [`CachingScanner`].
    pub fn with_host(host: Arc<dyn Host>, platform: Platform) -> Self {
        let scanner = Arc::new(CachingScanner::new(host.clone()));
        Self::with_scanner(host, platform, scanner)
    }

    /// Detector with an explicit scan engine.
    pub fn with_scanner(
        host: Arc<dyn Host>,
        platform: Platform,
        scanner: Arc<dyn Scanner>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(host.clone(), platform),
            validator: Arc::new(JdkValidator::new(host.clone(), platform)),
            host,
            scanner,
        }
    }

    /// The directories a detection with `options` would search.
    pub async fn search_paths(&self, options: &DetectOptions) -> SearchPathSet {
        self.resolver
            .resolve(options.jdk_paths.as_ref(), options.ignore_platform_paths)
            .await
    }

    /// Detect JDKs once.
    ///
    /// # Detection Process
    ///
    /// 1. Resolve the search paths (static, platform, caller-supplied)
    /// 2. Scan each path and its direct subdirectories with the validator
    /// 3. Return the scanner's result set, or its plain projection
    ///
    /// Results are cached per search space; set [`DetectOptions::force`] to
    /// scan again.
    ///
    /// # Errors
    ///
    /// [`DetectError::Scan`](crate::DetectError::Scan) if a search root
    /// exists but cannot be listed. Directories that are not JDKs are never
    /// errors.
    pub async fn detect(&self, options: DetectOptions) -> Result<Detection> {
        let paths = self.search_paths(&options).await;
        let hash = paths.content_hash();
        tracing::debug!(paths = paths.len(), %hash, force = options.force, "detecting JDKs");

        let results = self
            .scanner
            .scan(ScanRequest {
                paths: paths.as_slice(),
                hash: &hash,
                force: options.force,
                validator: self.validator(),
                origin: None,
            })
            .await?;

        tracing::info!(jdks = results.len(), "JDK detection finished");
        Ok(Detection::from_results(results, options.native))
    }

    /// Detect JDKs and keep detecting as the search paths change.
    ///
    /// The returned handle first delivers the result of a forced scan, then a
    /// fresh result set after each burst of filesystem changes in a search
    /// path (bursts are coalesced over [`DetectOptions::debounce_ms`]).
    /// Failures are delivered as [`WatchEvent::Error`](crate::WatchEvent::Error),
    /// after which the handle stops; call `watch()` again to resume.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use jdk_discovery::{DetectOptions, JdkDetector, WatchEvent};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let detector = JdkDetector::new();
    ///     let mut handle = detector.watch(DetectOptions::default()).await;
    ///     while let Some(event) = handle.next_event().await {
    ///         match event {
    ///             WatchEvent::Results(found) => println!("{} JDKs", found.len()),
    ///             WatchEvent::Error(e) => eprintln!("watch stopped: {e}"),
    ///             _ => {}
    ///         }
    ///     }
    /// }
    /// ```
    pub async fn watch(&self, options: DetectOptions) -> WatchHandle {
        let paths = self.search_paths(&options).await;
        tracing::debug!(paths = paths.len(), "starting JDK watch");

        watch::start(WatchSession {
            host: self.host.clone(),
            scanner: self.scanner.clone(),
            validator: self.validator(),
            paths,
            native: options.native,
            debounce: options.debounce(),
        })
    }

    /// Clear the static and platform path caches and the scanner's cache.
    pub fn reset(&self) {
        self.resolver.reset();
        self.scanner.reset_cache();
        tracing::debug!("detection caches reset");
    }

    fn validator(&self) -> Arc<dyn Validate> {
        self.validator.clone()
    }
}

impl Default for JdkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JdkDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdkDetector")
            .field("resolver", &self.resolver)
            .field("validator", &self.validator)
            .finish()
    }
}

/// Detect JDKs with the process-wide detector.
///
/// See [`JdkDetector::detect`].
///
/// # Example
///
/// ```rust,no_run
/// use jdk_discovery::{detect, DetectOptions, JdkPaths};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let options = DetectOptions {
///         jdk_paths: Some(JdkPaths::from("/opt/java")),
///         ..Default::default()
///     };
///     let found = detect(options).await.unwrap();
///     if let Some(jdk) = found.entries().get("1.8.0_202") {
///         println!("Java 8u202 at {}", jdk.path.display());
///     }
/// }
/// ```
pub async fn detect(options: DetectOptions) -> Result<Detection> {
    DEFAULT_DETECTOR.detect(options).await
}

/// Watch for JDKs with the process-wide detector.
///
/// See [`JdkDetector::watch`].
pub async fn watch(options: DetectOptions) -> WatchHandle {
    DEFAULT_DETECTOR.watch(options).await
}

/// Clear the process-wide detector's caches.
pub fn reset() {
    DEFAULT_DETECTOR.reset();
}
