//! Burst coalescing for filesystem events.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

/// Groups items from a channel into bursts separated by a quiet period.
///
/// The timer restarts on every item, so a steady trickle of events keeps
/// extending the burst until the source goes quiet for `window`.
pub(crate) struct Debouncer<T> {
    rx: mpsc::UnboundedReceiver<T>,
    window: Duration,
}

impl<T> Debouncer<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>, window: Duration) -> Self {
        Self { rx, window }
    }

    /// Wait for the next burst.
    ///
    /// Returns `None` once the sending side has closed and nothing is pending.
    /// A burst that is cut short by the channel closing is still returned.
    pub(crate) async fn next_burst(&mut self) -> Option<Vec<T>> {
        let first = self.rx.recv().await?;
        let mut burst = vec![first];

        let quiet = sleep(self.window);
        tokio::pin!(quiet);

        loop {
            tokio::select! {
                () = &mut quiet => return Some(burst),
                item = self.rx.recv() => match item {
                    Some(item) => {
                        burst.push(item);
                        quiet.as_mut().reset(Instant::now() + self.window);
                    }
                    None => return Some(burst),
                },
            }
        }
    }
}
