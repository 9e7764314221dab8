//! # jdk-discovery
//!
//! Finds the Java Development Kits installed on a machine and keeps watching
//! for new ones.
//!
//! A directory is a JDK when it carries the JVM shared library for its
//! platform, the `java`, `javac`, `keytool` and `jarsigner` executables, and
//! a `javac` that answers `-version`. Each JDK is reported with its version,
//! build, architecture and executable paths.
//!
//! ## Features
//!
//! - `detect()` searches `PATH`, `JAVA_HOME`, the per-OS install roots (the
//!   Windows registry on Windows) and caller-supplied directories
//! - `watch()` re-detects as the searched directories change
//! - Results are cached per search space; `reset()` clears every cache
//! - [`JdkDetector`] runs detection against any [`Host`] implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use jdk_discovery::{detect, DetectOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let found = detect(DetectOptions::default()).await.unwrap();
//!     for (key, jdk) in found.entries() {
//!         println!("{key}: {} ({})", jdk.path.display(), jdk.architecture);
//!     }
//! }
//! ```

mod detect;
pub mod detection;
mod error;
pub mod host;
mod jdk_info;
mod options;
mod platform;
pub mod scanner;
mod watch;

#[cfg(test)]
mod testing;

pub use detect::{detect, reset, watch, Detection, JdkDetector};
pub use detection::{JdkValidator, PathResolver, SearchPathSet, JAVA_HOME_VAR};
pub use error::{DetectError, Result};
pub use host::{CommandOutput, Host, SystemHost};
pub use jdk_info::{Architecture, JdkInfo, Tool};
pub use options::{DetectOptions, JdkPaths, DEFAULT_DEBOUNCE_MS};
pub use platform::{Platform, JDK_REGISTRY_KEYS};
pub use scanner::{CachingScanner, ResultSet, ScanRequest, ScanUpdate, Scanner, Validate};
pub use watch::{WatchEvent, WatchHandle};
