use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::AppCommand;
use crate::utils::url::looks_like_video_url;

/// Delay before an edited URL triggers a metadata probe.
pub const PROBE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Coalesces rapid URL edits into a single delayed probe request.
///
/// Every notification cancels the pending timer; only the last value
/// observed when the timer finally expires is probed. Empty or
/// non-video-shaped input cancels the timer and fires a clear action
/// synchronously instead, so no stale probe can surface for it.
pub struct Debouncer {
    delay: Duration,
    tx: mpsc::Sender<AppCommand>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration, tx: mpsc::Sender<AppCommand>) -> Self {
        Self {
            delay,
            tx,
            pending: Mutex::new(None),
        }
    }

    /// Record the latest input value and (re)arm the timer.
    pub fn notify(&self, raw: &str) {
        let url = raw.trim().to_string();
        let mut pending = self.pending.lock().unwrap();
        if let Some(armed) = pending.take() {
            armed.abort();
        }

        if !looks_like_video_url(&url) {
            let _ = self.tx.try_send(AppCommand::InputCleared);
            return;
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppCommand::ProbeRequested { url }).await;
        }));
    }
}
