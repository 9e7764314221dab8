//! The live handle returned by `watch()`.

use crate::{DetectError, Detection, SearchPathSet};
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// An update delivered by a [`WatchHandle`].
#[derive(Debug)]
#[non_exhaustive]
pub enum WatchEvent {
    /// The current result set, after the initial scan or a re-scan.
    Results(Detection),
    /// The watch failed and has stopped. Call `watch()` again to resume.
    Error(DetectError),
}

type Unwatch = Box<dyn FnOnce() + Send>;

struct Shared {
    stopped: AtomicBool,
    unwatchers: Mutex<Vec<Unwatch>>,
    events: Mutex<Option<mpsc::UnboundedSender<WatchEvent>>>,
}

/// Cloneable sending side of a watch, held by watcher tasks.
#[derive(Clone)]
pub(crate) struct Emitter {
    shared: Arc<Shared>,
}

impl Emitter {
    /// Register a callback to run once when the watch stops.
    ///
    /// If the watch has already stopped, the callback runs immediately.
    pub(crate) fn on_stop(&self, unwatch: impl FnOnce() + Send + 'static) {
        if !self.is_stopped() {
            let mut unwatchers = lock(&self.shared.unwatchers);
            // Re-check under the lock: stop() may have drained in between.
            if !self.is_stopped() {
                unwatchers.push(Box::new(unwatch));
                return;
            }
        }
        unwatch();
    }

    pub(crate) fn results(&self, detection: Detection) {
        self.send(WatchEvent::Results(detection));
    }

    /// Deliver `error` and stop the watch.
    pub(crate) fn error(&self, error: DetectError) {
        if self.is_stopped() {
            tracing::debug!(%error, "discarding error from stopped watch");
            return;
        }
        tracing::warn!(%error, "watch failed, stopping");
        self.send(WatchEvent::Error(error));
        self.stop();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Release every watcher, in registration order. Later calls do nothing.
    pub(crate) fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        lock(&self.shared.events).take();

        let unwatchers = std::mem::take(&mut *lock(&self.shared.unwatchers));
        if !unwatchers.is_empty() {
            tracing::debug!(watchers = unwatchers.len(), "stopping watch");
        }
        for unwatch in unwatchers {
            unwatch();
        }
    }

    fn send(&self, event: WatchEvent) {
        if let Some(events) = lock(&self.shared.events).as_ref() {
            // The receiver lives in the handle; if it is gone so is the watch.
            let _ = events.send(event);
        }
    }
}

/// Live handle on a running watch.
///
/// Events are read with [`next_event`](Self::next_event) or through the
/// [`Stream`] implementation. The stream ends after the watch stops, once
/// already delivered events have been read.
///
/// # State
///
/// A handle is active until [`stop`](Self::stop) is called, an
/// [`WatchEvent::Error`] is emitted, or the handle is dropped. Stopping is
/// one-way. A re-scan already running when the handle stops still completes,
/// but its result is discarded.
pub struct WatchHandle {
    emitter: Emitter,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    paths: SearchPathSet,
}

impl WatchHandle {
    pub(crate) fn new(paths: SearchPathSet) -> (Self, Emitter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Emitter {
            shared: Arc::new(Shared {
                stopped: AtomicBool::new(false),
                unwatchers: Mutex::default(),
                events: Mutex::new(Some(tx)),
            }),
        };
        let handle = Self {
            emitter: emitter.clone(),
            events: rx,
            paths,
        };
        (handle, emitter)
    }

    /// Stop watching. Safe to call any number of times.
    pub fn stop(&self) {
        self.emitter.stop();
    }

    /// Whether the watch has stopped.
    pub fn is_stopped(&self) -> bool {
        self.emitter.is_stopped()
    }

    /// The search paths being watched.
    pub fn paths(&self) -> &SearchPathSet {
        &self.paths
    }

    /// Wait for the next event; `None` once the watch has stopped and all
    /// delivered events were read.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

impl Stream for WatchHandle {
    type Item = WatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.emitter.stop();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("paths", &self.paths)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
