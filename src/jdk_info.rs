//! Detected JDK metadata.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// A tool that every JDK must ship in its `bin` directory.
///
/// A directory missing any one of these is not reported as a JDK.
///
/// # Example
///
/// ```rust
/// use jdk_discovery::Tool;
///
/// assert_eq!(Tool::Javac.as_ref(), "javac");
/// assert_eq!(Tool::all().count(), 4);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tool {
    /// The Java launcher.
    Java,
    /// The Java compiler, also used to probe the version.
    Javac,
    /// Key and certificate management tool.
    Keytool,
    /// JAR signing and verification tool.
    Jarsigner,
}

impl Tool {
    /// Iterator over all required tools.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }

    /// File name of the tool's binary given the platform's executable suffix.
    pub fn file_name(&self, exe_suffix: &str) -> String {
        format!("{}{}", self.as_ref(), exe_suffix)
    }
}

/// Word size the JDK's compiler was probed as.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::Display,
)]
pub enum Architecture {
    /// The compiler rejected the 64-bit flag.
    #[serde(rename = "32bit")]
    #[strum(serialize = "32bit")]
    Bits32,
    /// The compiler accepted the 64-bit flag.
    #[serde(rename = "64bit")]
    #[strum(serialize = "64bit")]
    Bits64,
}

/// Metadata for a directory that passed JDK validation.
///
/// A `JdkInfo` is only ever produced for a directory that has the JVM shared
/// library, all four [`Tool`] binaries, and a compiler that could be run.
/// `version` and `build` are `None` when the compiler's banner did not match
/// the `javac <version>_<build>` form (for example `javac 17.0.2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdkInfo {
    /// Root directory of the JDK.
    pub path: PathBuf,

    /// Version part of the compiler banner, e.g. `1.8.0`.
    pub version: Option<String>,

    /// Build part of the compiler banner, e.g. `202`.
    pub build: Option<String>,

    /// Architecture the compiler was probed as.
    pub architecture: Architecture,

    /// Resolved binary path for each required tool.
    pub executables: BTreeMap<Tool, PathBuf>,
}

impl JdkInfo {
    /// Deduplication key: `version_build`, with `null` standing in for
    /// either part when it is absent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use jdk_discovery::{Architecture, JdkInfo};
    /// use std::collections::BTreeMap;
    ///
    /// let info = JdkInfo {
    ///     path: "/opt/jdk1".into(),
    ///     version: Some("1.8.0".to_string()),
    ///     build: Some("202".to_string()),
    ///     architecture: Architecture::Bits64,
    ///     executables: BTreeMap::new(),
    /// };
    /// assert_eq!(info.key(), "1.8.0_202");
    /// ```
    pub fn key(&self) -> String {
        format!(
            "{}_{}",
            self.version.as_deref().unwrap_or("null"),
            self.build.as_deref().unwrap_or("null")
        )
    }

    /// Path of a tool's binary.
    pub fn executable(&self, tool: Tool) -> Option<&Path> {
        self.executables.get(&tool).map(PathBuf::as_path)
    }

    /// The version as a semantic version, for ordering.
    ///
    /// Missing minor or patch components are filled with zero and trailing
    /// qualifiers are ignored, so `17` becomes `17.0.0` and `9-ea` becomes
    /// `9.0.0`.
    pub fn parsed_version(&self) -> Option<Version> {
        let raw = self.version.as_deref()?;
        if let Ok(version) = Version::parse(raw) {
            return Some(version);
        }

        let mut numbers = raw
            .split(|c: char| !c.is_ascii_digit())
            .take_while(|part| !part.is_empty())
            .map(|part| part.parse::<u64>());
        let major = numbers.next()?.ok()?;
        let minor = numbers.next().and_then(|n| n.ok()).unwrap_or(0);
        let patch = numbers.next().and_then(|n| n.ok()).unwrap_or(0);
        Some(Version::new(major, minor, patch))
    }
}
