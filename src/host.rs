//! OS services used by detection.
//!
//! Everything that touches the environment, the filesystem, or spawns a
//! process goes through the [`Host`] trait so detection can run against an
//! in-memory host in tests. [`SystemHost`] is the real implementation.

use crate::detection::parse_reg_query;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of running a process to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// OS services consumed by path resolution, validation and scanning.
///
/// Filesystem probes are synchronous and cheap; process and registry access
/// return boxed futures so the trait stays object safe.
pub trait Host: Send + Sync + 'static {
    /// Locate an executable through the process search path.
    fn which(&self, name: &str) -> Option<PathBuf>;

    /// Read an environment variable.
    fn env_var(&self, name: &str) -> Option<String>;

    /// Resolve all symlinks in `path`. Fails if the path does not exist.
    fn realpath(&self, path: &Path) -> io::Result<PathBuf>;

    /// Whether `path` is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` is a regular file, following symlinks.
    fn is_file(&self, path: &Path) -> bool;

    /// Direct entries of a directory, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Run `program` with `args` and capture its output.
    ///
    /// An `Err` means the process could not be spawned; a non-zero exit is
    /// reported through [`CommandOutput::success`].
    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [&'a str],
    ) -> BoxFuture<'a, io::Result<CommandOutput>>;

    /// Read a string value from the Windows registry.
    fn registry_value<'a>(&'a self, key: &'a str, name: &'a str) -> BoxFuture<'a, Option<String>>;
}

/// [`Host`] backed by the real operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn which(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [&'a str],
    ) -> BoxFuture<'a, io::Result<CommandOutput>> {
        async move {
            let output = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;

            Ok(CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        .boxed()
    }

    fn registry_value<'a>(&'a self, key: &'a str, name: &'a str) -> BoxFuture<'a, Option<String>> {
        async move {
            if !cfg!(windows) {
                return None;
            }

            let args = ["query", key, "/v", name];
            match self.run(Path::new("reg"), &args).await {
                Ok(output) if output.success => parse_reg_query(&output.stdout, name),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(key, name, error = %e, "registry query failed");
                    None
                }
            }
        }
        .boxed()
    }
}
