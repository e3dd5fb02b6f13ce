use serde::Serialize;
use thiserror::Error;

use crate::engine::{DownloadRequest, RawProgress};
use crate::progress::{ProgressSnapshot, ProgressTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    InProgress,
    Completed,
    Failed,
}

/// A start request arrived while a download was already active. The existing
/// session is left untouched; nothing is queued.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("a download is already in progress")]
pub struct StartRejected;

/// The single in-flight-or-idle download slot.
///
/// Owned exclusively by the core loop; every transition happens on its
/// serial stream of commands, so no locking is involved. Whatever the fetch
/// resolves to, the slot always ends up back at `Idle`.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    request: Option<DownloadRequest>,
    progress: ProgressTracker,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            request: None,
            progress: ProgressTracker::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn request(&self) -> Option<&DownloadRequest> {
        self.request.as_ref()
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        self.progress.latest()
    }

    /// `Idle → Starting`. The sole concurrency guard: any other state
    /// rejects without side effects.
    pub fn begin(&mut self, request: DownloadRequest) -> Result<(), StartRejected> {
        if self.state != SessionState::Idle {
            return Err(StartRejected);
        }
        self.state = SessionState::Starting;
        self.request = Some(request);
        self.progress.reset();
        Ok(())
    }

    /// `Starting → InProgress`, once the fetch task has been handed to the
    /// task runner.
    pub fn mark_dispatched(&mut self) {
        if self.state == SessionState::Starting {
            self.state = SessionState::InProgress;
        }
    }

    /// Fold a raw engine sample into the session's progress record. Samples
    /// arriving outside an active download (late deliveries from a resolved
    /// fetch) are dropped.
    pub fn apply_progress(&mut self, raw: &RawProgress) -> Option<ProgressSnapshot> {
        if self.state != SessionState::InProgress {
            return None;
        }
        Some(self.progress.observe(raw))
    }

    /// Successful fetch resolution. Releases the slot and hands back the
    /// request so the caller can record history.
    pub fn complete(&mut self) -> (Option<DownloadRequest>, ProgressSnapshot) {
        let snapshot = self.progress.mark_done();
        (self.release(), snapshot)
    }

    /// Failed fetch resolution. The slot is released all the same.
    pub fn fail(&mut self) -> (Option<DownloadRequest>, ProgressSnapshot) {
        let snapshot = self.progress.mark_failed();
        (self.release(), snapshot)
    }

    fn release(&mut self) -> Option<DownloadRequest> {
        self.state = SessionState::Idle;
        self.request.take()
    }
}
