//! The JDK validation predicate.

use super::probe::probe_compiler;
use crate::host::Host;
use crate::scanner::Validate;
use crate::{JdkInfo, Platform, Tool};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decides whether a directory is a JDK and extracts its metadata.
///
/// # Validation Process
///
/// 1. On macOS, substitute `Contents/Home` when the directory is a bundle
/// 2. Require one of the platform's `libjvm` locations (no process is spawned
///    for directories without it)
/// 3. Require `java`, `javac`, `keytool` and `jarsigner` under `bin`
/// 4. Run `javac -J-d64 -version`, falling back to `javac -version` (32-bit)
/// 5. Parse `javac <version>_<build>` from the banner; a banner that does not
///    match still yields a JDK, with version and build absent
///
/// Every failure along the way means "not a JDK" and yields `None`.
#[derive(Clone)]
pub struct JdkValidator {
    host: Arc<dyn Host>,
    platform: Platform,
}

impl JdkValidator {
    /// Create a validator using `host` and the conventions of `platform`.
    pub fn new(host: Arc<dyn Host>, platform: Platform) -> Self {
        Self { host, platform }
    }

    /// The platform whose layout conventions are applied.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Validate `dir`, returning its metadata if it is a JDK.
    pub async fn validate(&self, dir: &Path) -> Option<JdkInfo> {
        let root = self.jdk_root(dir);

        if !self.has_libjvm(&root) {
            tracing::trace!(dir = %root.display(), "no libjvm, not a JDK");
            return None;
        }

        let executables = self.find_executables(&root)?;
        let javac = executables.get(&Tool::Javac)?;
        let probe = probe_compiler(self.host.as_ref(), javac).await?;

        let (version, build) = probe.version_and_build().unzip();
        if version.is_none() {
            tracing::debug!(dir = %root.display(), "compiler banner has no version_build");
        }

        Some(JdkInfo {
            path: root,
            version,
            build,
            architecture: probe.architecture,
            executables,
        })
    }

    fn jdk_root(&self, dir: &Path) -> PathBuf {
        if let Some(home) = self.platform.bundle_home() {
            let nested = dir.join(home);
            if self.host.is_dir(&nested) {
                return nested;
            }
        }
        dir.to_path_buf()
    }

    fn has_libjvm(&self, root: &Path) -> bool {
        self.platform
            .libjvm_paths()
            .iter()
            .any(|relative| self.host.is_file(&root.join(relative)))
    }

    fn find_executables(&self, root: &Path) -> Option<BTreeMap<Tool, PathBuf>> {
        let bin = root.join("bin");
        Tool::all()
            .map(|tool| {
                let path = bin.join(tool.file_name(self.platform.exe_suffix()));
                if !self.host.is_file(&path) {
                    tracing::debug!(dir = %root.display(), %tool, "missing required executable");
                    return None;
                }
                let real = self.host.realpath(&path).ok()?;
                Some((tool, real))
            })
            .collect()
    }
}

impl Validate for JdkValidator {
    fn validate<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Option<JdkInfo>> {
        JdkValidator::validate(self, dir).boxed()
    }
}

impl fmt::Debug for JdkValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdkValidator")
            .field("platform", &self.platform)
            .finish()
    }
}
