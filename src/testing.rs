//! In-memory [`Host`] for unit tests.

use crate::host::{CommandOutput, Host};
use crate::{Platform, Tool};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
    links: Vec<(PathBuf, PathBuf)>,
    unreadable: BTreeSet<PathBuf>,
    which: HashMap<String, PathBuf>,
    env: HashMap<String, String>,
    runs: HashMap<(PathBuf, Vec<String>), Option<CommandOutput>>,
    registry: HashMap<(String, String), String>,
}

/// Fake filesystem, environment and process table with call counters.
#[derive(Default)]
pub(crate) struct FakeHost {
    state: Mutex<State>,
    which_calls: AtomicUsize,
    fs_calls: AtomicUsize,
    run_calls: AtomicUsize,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stderr(text: &str) -> CommandOutput {
        CommandOutput {
            success: true,
            stdout: String::new(),
            stderr: format!("{text}\n"),
        }
    }

    pub(crate) fn failure(text: &str) -> CommandOutput {
        CommandOutput {
            success: false,
            stdout: String::new(),
            stderr: format!("{text}\n"),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state();
        for ancestor in path.as_ref().ancestors() {
            state.dirs.insert(ancestor.to_path_buf());
        }
    }

    pub(crate) fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.state().files.insert(path.to_path_buf());
    }

    /// Remove a directory and everything below it.
    pub(crate) fn remove_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state();
        state.dirs.retain(|p| !p.starts_with(path));
        state.files.retain(|p| !p.starts_with(path));
    }

    /// Make `from` a symlink to `to`.
    pub(crate) fn link(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) {
        self.state()
            .links
            .push((from.as_ref().to_path_buf(), to.as_ref().to_path_buf()));
    }

    pub(crate) fn make_unreadable(&self, path: impl AsRef<Path>) {
        self.state().unreadable.insert(path.as_ref().to_path_buf());
    }

    pub(crate) fn set_which(&self, name: &str, path: impl AsRef<Path>) {
        self.state()
            .which
            .insert(name.to_string(), path.as_ref().to_path_buf());
    }

    pub(crate) fn set_env(&self, name: &str, value: &str) {
        self.state().env.insert(name.to_string(), value.to_string());
    }

    pub(crate) fn set_registry(&self, key: &str, name: &str, value: &str) {
        self.state()
            .registry
            .insert((key.to_string(), name.to_string()), value.to_string());
    }

    /// Script the result of running `program args`; `None` is a spawn failure.
    pub(crate) fn on_run(&self, program: &Path, args: &[&str], output: Option<CommandOutput>) {
        let args = args.iter().map(|a| a.to_string()).collect();
        self.state()
            .runs
            .insert((program.to_path_buf(), args), output);
    }

    /// Lay out a complete JDK under `root` whose compiler prints `banner`.
    pub(crate) fn add_jdk(&self, root: impl AsRef<Path>, platform: Platform, banner: &str) {
        let root = root.as_ref();
        self.add_file(root.join(platform.libjvm_paths()[0]));
        for tool in Tool::all() {
            self.add_file(root.join("bin").join(tool.file_name(platform.exe_suffix())));
        }
        let javac = root
            .join("bin")
            .join(Tool::Javac.file_name(platform.exe_suffix()));
        self.on_run(&javac, &["-J-d64", "-version"], Some(Self::stderr(banner)));
    }

    pub(crate) fn which_count(&self) -> usize {
        self.which_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fs_count(&self) -> usize {
        self.fs_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let state = self.state();
        for (from, to) in &state.links {
            if let Ok(rest) = path.strip_prefix(from) {
                return if rest.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(rest)
                };
            }
        }
        path.to_path_buf()
    }
}

impl Host for FakeHost {
    fn which(&self, name: &str) -> Option<PathBuf> {
        self.which_calls.fetch_add(1, Ordering::SeqCst);
        self.state().which.get(name).cloned()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.state().env.get(name).cloned()
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        self.fs_calls.fetch_add(1, Ordering::SeqCst);
        let real = self.resolve(path);
        let state = self.state();
        if state.dirs.contains(&real) || state.files.contains(&real) {
            Ok(real)
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.fs_calls.fetch_add(1, Ordering::SeqCst);
        let real = self.resolve(path);
        self.state().dirs.contains(&real)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.fs_calls.fetch_add(1, Ordering::SeqCst);
        let real = self.resolve(path);
        self.state().files.contains(&real)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.fs_calls.fetch_add(1, Ordering::SeqCst);
        let real = self.resolve(path);
        let state = self.state();
        if state.unreadable.contains(&real) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if !state.dirs.contains(&real) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(state
            .dirs
            .iter()
            .chain(state.files.iter())
            .filter(|p| p.parent() == Some(real.as_path()))
            .filter_map(|p| p.file_name().map(|name| path.join(name)))
            .collect())
    }

    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [&'a str],
    ) -> BoxFuture<'a, io::Result<CommandOutput>> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        let key = (
            program.to_path_buf(),
            args.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        );
        let scripted = self.state().runs.get(&key).cloned();
        async move {
            match scripted {
                Some(Some(output)) => Ok(output),
                Some(None) => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        }
        .boxed()
    }

    fn registry_value<'a>(&'a self, key: &'a str, name: &'a str) -> BoxFuture<'a, Option<String>> {
        let value = self
            .state()
            .registry
            .get(&(key.to_string(), name.to_string()))
            .cloned();
        async move { value }.boxed()
    }
}
