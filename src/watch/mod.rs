//! Live re-detection driven by filesystem events.
//!
//! ```text
//! notify event on a search root, or on its parent naming the root
//!   -> drop access events
//!   -> (re)install the direct watch if the root was created
//!   -> debounce per root
//!   -> forced re-scan of that root under the watch's hash
//!   -> WatchEvent::Results
//! ```
//!
//! Scanner updates for the same hash caused by other scans are forwarded too.

mod debounce;
mod handle;

pub use handle::{WatchEvent, WatchHandle};

use crate::host::Host;
use crate::scanner::{ScanRequest, ScanUpdate, Scanner, Validate};
use crate::{DetectError, Detection, Result, SearchPathSet};
use debounce::Debouncer;
use handle::Emitter;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// Everything a running watch needs, shared by its tasks.
pub(crate) struct WatchSession {
    pub(crate) host: Arc<dyn Host>,
    pub(crate) scanner: Arc<dyn Scanner>,
    pub(crate) validator: Arc<dyn Validate>,
    pub(crate) paths: SearchPathSet,
    pub(crate) native: bool,
    pub(crate) debounce: Duration,
}

struct Running {
    session: WatchSession,
    hash: String,
    origin: u64,
}

/// Start watching `session.paths`. Must be called within a tokio runtime.
pub(crate) fn start(session: WatchSession) -> WatchHandle {
    let running = Arc::new(Running {
        hash: session.paths.content_hash(),
        origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
        session,
    });
    let (handle, emitter) = WatchHandle::new(running.session.paths.clone());

    // Subscribe before the first scan so no update can slip past.
    let updates = running.session.scanner.subscribe();
    let forwarder = tokio::spawn(forward_updates(running.clone(), updates, emitter.clone()));
    emitter.on_stop(move || forwarder.abort());

    let roots = running.session.paths.iter().cloned().collect();
    tokio::spawn(running.clone().scan(roots, emitter.clone()));

    for dir in running.session.paths.iter() {
        if emitter.is_stopped() {
            break;
        }
        if let Err(error) = running.clone().watch_dir(dir, &emitter) {
            emitter.error(error);
            break;
        }
    }

    handle
}

impl Running {
    /// Forced scan of `roots`; the result is dropped if the watch has stopped.
    async fn scan(self: Arc<Self>, roots: Vec<PathBuf>, emitter: Emitter) {
        let request = ScanRequest {
            paths: &roots,
            hash: &self.hash,
            force: true,
            validator: self.session.validator.clone(),
            origin: Some(self.origin),
        };
        match self.session.scanner.scan(request).await {
            Ok(results) => emitter.results(Detection::from_results(results, self.session.native)),
            Err(error) => emitter.error(error),
        }
    }

    /// Watch `dir` directly when it exists, and through its parent so that
    /// its creation, removal and re-creation are seen.
    fn watch_dir(self: Arc<Self>, dir: &Path, emitter: &Emitter) -> Result<()> {
        let host = &self.session.host;
        let parent = dir.parent().filter(|parent| host.is_dir(parent));
        if parent.is_none() && !host.is_dir(dir) {
            tracing::debug!(
                dir = %dir.display(),
                "neither directory nor parent exists, not watching"
            );
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watchers = Arc::new(Mutex::new(DirWatchers::default()));
        let to_error = |source: notify::Error| DetectError::Watch {
            path: dir.to_path_buf(),
            source,
        };
        if let Some(parent) = parent {
            let watcher = install_watcher(parent, Some(dir.to_path_buf()), tx.clone())
                .map_err(to_error)?;
            lock(&watchers).parent = Some(watcher);
        }
        self.refresh_direct_watch(dir, &watchers, &tx, false)
            .map_err(to_error)?;
        tracing::info!(dir = %dir.display(), "watching for JDK changes");

        let task = tokio::spawn(self.debounce_loop(
            dir.to_path_buf(),
            watchers.clone(),
            tx,
            rx,
            emitter.clone(),
        ));
        emitter.on_stop(move || {
            *lock(&watchers) = DirWatchers::default();
            task.abort();
        });
        Ok(())
    }

    /// Install a direct watch on `dir` if it exists and has none, or replace
    /// it when `recreated` since the old one went away with the directory.
    fn refresh_direct_watch(
        &self,
        dir: &Path,
        watchers: &Mutex<DirWatchers>,
        tx: &mpsc::UnboundedSender<DirEvent>,
        recreated: bool,
    ) -> notify::Result<()> {
        if !self.session.host.is_dir(dir) {
            return Ok(());
        }
        let mut watchers = lock(watchers);
        if watchers.direct.is_some() && !recreated {
            return Ok(());
        }
        watchers.direct = Some(install_watcher(dir, None, tx.clone())?);
        tracing::debug!(dir = %dir.display(), recreated, "watching directory contents");
        Ok(())
    }

    async fn debounce_loop(
        self: Arc<Self>,
        dir: PathBuf,
        watchers: Arc<Mutex<DirWatchers>>,
        tx: mpsc::UnboundedSender<DirEvent>,
        rx: mpsc::UnboundedReceiver<DirEvent>,
        emitter: Emitter,
    ) {
        let mut bursts = Debouncer::new(rx, self.session.debounce);
        while let Some(burst) = bursts.next_burst().await {
            let events = burst.len();
            let mut recreated = false;
            for res in burst {
                match res {
                    Ok(event) => recreated |= names_dir(&event, &dir),
                    Err(source) => {
                        emitter.error(DetectError::Watch { path: dir, source });
                        return;
                    }
                }
            }
            if emitter.is_stopped() {
                return;
            }
            if let Err(source) = self.refresh_direct_watch(&dir, &watchers, &tx, recreated) {
                emitter.error(DetectError::Watch { path: dir, source });
                return;
            }

            tracing::info!(dir = %dir.display(), events, "change detected, re-scanning");
            // Detached: a re-scan in flight finishes even if the watch stops.
            tokio::spawn(self.clone().scan(vec![dir.clone()], emitter.clone()));
        }
    }
}

type DirEvent = notify::Result<Event>;

/// The watchers serving one search root.
#[derive(Default)]
struct DirWatchers {
    /// Parent of the root, reporting only events that name the root.
    parent: Option<RecommendedWatcher>,
    /// The root itself, while it exists.
    direct: Option<RecommendedWatcher>,
}

/// Non-recursive watcher on `target` forwarding into `tx`. Access events are
/// dropped; with `only`, so is every event not naming that path.
fn install_watcher(
    target: &Path,
    only: Option<PathBuf>,
    tx: mpsc::UnboundedSender<DirEvent>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: DirEvent| {
            if let Ok(event) = &res {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                if let Some(only) = &only {
                    if !event.paths.iter().any(|p| p == only) {
                        return;
                    }
                }
            }
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(target, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Whether `event` reports `dir` itself appearing.
fn names_dir(event: &Event, dir: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
    ) && event.paths.iter().any(|p| p == dir)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn forward_updates(
    running: Arc<Running>,
    mut updates: broadcast::Receiver<ScanUpdate>,
    emitter: Emitter,
) {
    loop {
        match updates.recv().await {
            Ok(update) => {
                if update.results.hash() != running.hash || update.origin == Some(running.origin) {
                    continue;
                }
                emitter.results(Detection::from_results(
                    update.results,
                    running.session.native,
                ));
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "watch fell behind scanner updates");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::CachingScanner;
    use crate::testing::FakeHost;
    use crate::{JdkValidator, Platform};

    fn session(
        host: &Arc<FakeHost>,
        scanner: &Arc<CachingScanner>,
        paths: &[&str],
    ) -> WatchSession {
        WatchSession {
            host: host.clone(),
            scanner: scanner.clone(),
            validator: Arc::new(JdkValidator::new(host.clone(), Platform::Linux)),
            paths: paths.iter().map(PathBuf::from).collect(),
            native: true,
            debounce: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_initial_results_emitted() {
        let host = Arc::new(FakeHost::new());
        let scanner = Arc::new(CachingScanner::new(host.clone()));

        // Neither the directory nor its parent exists, so it is scanned but
        // not watched.
        let mut handle = start(session(&host, &scanner, &["/definitely/missing/root/jdk"]));
        match handle.next_event().await {
            Some(WatchEvent::Results(Detection::Native(results))) => assert!(results.is_empty()),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!handle.is_stopped());
        handle.stop();
    }

    #[tokio::test]
    async fn test_foreign_scanner_updates_forwarded() {
        let host = Arc::new(FakeHost::new());
        let scanner = Arc::new(CachingScanner::new(host.clone()));
        let session = session(&host, &scanner, &["/definitely/missing/root"]);
        let hash = session.paths.content_hash();
        let roots: Vec<PathBuf> = session.paths.iter().cloned().collect();
        let validator = session.validator.clone();

        let mut handle = start(session);
        assert!(matches!(handle.next_event().await, Some(WatchEvent::Results(_))));

        // Another scan of the same search space finds a new JDK.
        host.add_jdk("/definitely/missing/root", Platform::Linux, "javac 1.7.0_80");
        scanner
            .scan(ScanRequest {
                paths: &roots,
                hash: &hash,
                force: true,
                validator,
                origin: None,
            })
            .await
            .unwrap();

        match handle.next_event().await {
            Some(WatchEvent::Results(detection)) => {
                assert!(detection.entries().contains_key("1.7.0_80"))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_names_dir() {
        use notify::event::{CreateKind, DataChange, RenameMode};

        let dir = Path::new("/srv/jdks");
        let event = |kind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        assert!(names_dir(&event(EventKind::Create(CreateKind::Folder), "/srv/jdks"), dir));
        assert!(names_dir(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), "/srv/jdks"),
            dir
        ));
        assert!(!names_dir(
            &event(EventKind::Create(CreateKind::Folder), "/srv/jdks/jdk8"),
            dir
        ));
        assert!(!names_dir(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Any)), "/srv/jdks"),
            dir
        ));
    }

    #[tokio::test]
    async fn test_scan_failure_stops_watch() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let host = Arc::new(FakeHost::new());
        host.add_dir(root);
        host.make_unreadable(root);
        let scanner = Arc::new(CachingScanner::new(host.clone()));

        let mut handle = start(session(&host, &scanner, &[root]));
        assert!(matches!(
            handle.next_event().await,
            Some(WatchEvent::Error(DetectError::Scan { .. }))
        ));
        assert!(handle.next_event().await.is_none());
        assert!(handle.is_stopped());
    }
}
