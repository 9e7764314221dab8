//! Detection options configuration.
//!
//! This module provides the [`DetectOptions`] struct for configuring
//! detection and watching, and [`JdkPaths`] for caller-supplied search paths.

use crate::{DetectError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period before a burst of filesystem events triggers a re-scan.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Extra directories to search, supplied by the caller.
///
/// Accepts a single path or a list of paths. When read from JSON, anything
/// other than a string or a list of strings is rejected with
/// [`DetectError::InvalidJdkPaths`].
///
/// # Example
///
/// ```rust
/// use jdk_discovery::JdkPaths;
///
/// let one = JdkPaths::from("/opt/jdk1");
/// let many = JdkPaths::from(vec!["/opt/jdk1", "/opt/jdk2"]);
/// assert_eq!(one.len(), 1);
/// assert_eq!(many.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Vec<PathBuf>")]
pub struct JdkPaths(Vec<PathBuf>);

impl JdkPaths {
    /// Parse a JSON value that must be a string or a list of strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(path) => Ok(Self(vec![PathBuf::from(path)])),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(path) => Ok(PathBuf::from(path)),
                    other => Err(DetectError::InvalidJdkPaths {
                        found: format!("list containing {}", json_type(other)),
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self),
            other => Err(DetectError::InvalidJdkPaths {
                found: json_type(other).to_string(),
            }),
        }
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no paths were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the supplied paths.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

impl TryFrom<Value> for JdkPaths {
    type Error = DetectError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

impl From<JdkPaths> for Vec<PathBuf> {
    fn from(paths: JdkPaths) -> Self {
        paths.0
    }
}

impl From<&str> for JdkPaths {
    fn from(path: &str) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<String> for JdkPaths {
    fn from(path: String) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<PathBuf> for JdkPaths {
    fn from(path: PathBuf) -> Self {
        Self(vec![path])
    }
}

impl<P: Into<PathBuf>> From<Vec<P>> for JdkPaths {
    fn from(paths: Vec<P>) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

/// Configuration options for detection and watching.
///
/// # Example
///
/// ```rust
/// use jdk_discovery::{DetectOptions, JdkPaths};
///
/// // Defaults: platform paths included, plain results, cache honored
/// let opts = DetectOptions::default();
///
/// // Only look where the caller says
/// let opts = DetectOptions {
///     ignore_platform_paths: true,
///     jdk_paths: Some(JdkPaths::from("/opt/jdk1")),
///     force: true,
///     ..Default::default()
/// };
///
/// // From JSON, with the same field names the JavaScript tooling uses
/// let opts = DetectOptions::from_json(serde_json::json!({
///     "jdkPaths": ["/opt/jdk1"],
///     "gawk": true,
/// })).unwrap();
/// assert!(opts.native);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectOptions {
    /// Skip the well-known per-OS install roots.
    ///
    /// Default: `false`
    pub ignore_platform_paths: bool,

    /// Extra directories to search on top of the static and platform paths.
    ///
    /// Default: `None`
    pub jdk_paths: Option<JdkPaths>,

    /// Return the scanner's [`ResultSet`](crate::ResultSet) instead of a
    /// plain map of identity key to JDK.
    ///
    /// Default: `false`
    #[serde(rename = "gawk", alias = "native")]
    pub native: bool,

    /// Bypass the scanner's result cache.
    ///
    /// Default: `false`
    pub force: bool,

    /// Quiet period in milliseconds before a burst of filesystem events on a
    /// watched directory triggers a re-scan. Only used by `watch()`.
    ///
    /// Default: 500
    pub debounce_ms: u64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            ignore_platform_paths: false,
            jdk_paths: None,
            native: false,
            force: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl DetectOptions {
    /// Build options from a JSON object.
    ///
    /// `jdkPaths` is checked first so a malformed value is reported as
    /// [`DetectError::InvalidJdkPaths`]; other malformed fields are reported
    /// as [`DetectError::InvalidOptions`].
    pub fn from_json(mut value: Value) -> Result<Self> {
        let jdk_paths = match value.as_object_mut().and_then(|obj| obj.remove("jdkPaths")) {
            None | Some(Value::Null) => None,
            Some(paths) => Some(JdkPaths::from_value(&paths)?),
        };

        let mut options: Self = serde_json::from_value(value)?;
        options.jdk_paths = jdk_paths;
        Ok(options)
    }

    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
