//! Per-OS JDK layout conventions.

use serde::{Deserialize, Serialize};

/// Registry keys under which JDK installers record the current version.
///
/// Each key has a `CurrentVersion` value naming a subkey, and that subkey has
/// a `JavaHome` value with the install directory.
pub const JDK_REGISTRY_KEYS: &[&str] = &[
    r"HKEY_LOCAL_MACHINE\SOFTWARE\JavaSoft\Java Development Kit",
    r"HKEY_LOCAL_MACHINE\SOFTWARE\JavaSoft\JDK",
];

/// Directory inside a macOS JDK bundle that holds the real JDK root.
pub(crate) const BUNDLE_HOME: &str = "Contents/Home";

/// The OS family whose filesystem conventions apply.
///
/// Detection normally uses [`Platform::current()`]; the other variants can be
/// passed explicitly to inspect another OS's layout, as the tests do.
///
/// # Example
///
/// ```rust
/// use jdk_discovery::Platform;
///
/// assert_eq!(Platform::Windows.exe_suffix(), ".exe");
/// assert_eq!(Platform::Linux.exe_suffix(), "");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
)]
#[non_exhaustive]
pub enum Platform {
    /// Linux and other ELF-based Unixes using `/usr/lib/jvm`.
    Linux,
    /// macOS, whose JDK bundles nest the root in `Contents/Home`.
    MacOs,
    /// Windows, whose installers register themselves in the registry.
    Windows,
    /// Anything else: no well-known roots, Linux-style library names.
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Suffix appended to tool names to form binary file names.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    /// Relative locations of the JVM shared library inside a JDK root.
    ///
    /// The presence of any one of these is the cheapest JDK fingerprint.
    pub fn libjvm_paths(&self) -> &'static [&'static str] {
        match self {
            Self::MacOs => &["lib/server/libjvm.dylib", "jre/lib/server/libjvm.dylib"],
            Self::Windows => &[
                "bin/server/jvm.dll",
                "jre/bin/server/jvm.dll",
                "jre/bin/client/jvm.dll",
                "bin/client/jvm.dll",
            ],
            Self::Linux | Self::Other => &[
                "lib/server/libjvm.so",
                "jre/lib/server/libjvm.so",
                "jre/lib/amd64/server/libjvm.so",
                "jre/lib/i386/server/libjvm.so",
                "jre/lib/i386/client/libjvm.so",
                "lib/i386/server/libjvm.so",
            ],
        }
    }

    /// Subdirectory that holds the real JDK root inside a bundle, if the
    /// platform packages JDKs that way.
    pub fn bundle_home(&self) -> Option<&'static str> {
        match self {
            Self::MacOs => Some(BUNDLE_HOME),
            _ => None,
        }
    }

    /// Fixed install roots searched unless platform paths are skipped.
    ///
    /// Windows has none here; its roots come from [`JDK_REGISTRY_KEYS`].
    pub fn well_known_roots(&self) -> &'static [&'static str] {
        match self {
            Self::Linux => &["/usr/lib/jvm"],
            Self::MacOs => &[
                "/Library/Java/JavaVirtualMachines",
                "/System/Library/Java/JavaVirtualMachines",
            ],
            _ => &[],
        }
    }

    /// Whether well-known roots are read from the registry.
    pub fn uses_registry(&self) -> bool {
        matches!(self, Self::Windows)
    }
}
