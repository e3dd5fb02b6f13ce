use std::sync::Arc;

use crate::engine::Metadata;
use crate::history::HistoryEntry;
use crate::progress::ProgressSnapshot;
use crate::session::SessionState;
use crate::thumbnail::Thumbnail;

/// Everything the embedding front-end needs to render, published as a
/// discriminated union. The front-end consumes this as
/// `{ "type": "progress", ... }` and so on.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Free-form status line ("Fetching video information...", "Ready").
    Status { message: String },
    /// A start request was rejected before any worker was dispatched.
    ValidationFailed { message: String },
    /// A probe resolved; supersedes any previously shown metadata.
    MetadataLoaded { metadata: Metadata },
    /// Input was cleared or became invalid; drop the metadata panel.
    MetadataCleared,
    /// The probed video's thumbnail, decoded and scaled for display.
    ThumbnailReady { thumbnail: Thumbnail },
    /// The download slot changed state.
    SessionChanged { state: SessionState },
    /// Latest progress for the in-flight download.
    Progress {
        snapshot: ProgressSnapshot,
        text: String,
    },
    DownloadCompleted { title: String },
    DownloadFailed { message: String },
    /// The ledger changed (or was loaded at startup); newest first.
    HistoryUpdated { entries: Vec<HistoryEntry> },
}

/// Sink for UI-bound events. Called only from the core loop, in order.
pub type EventEmitter = Arc<dyn Fn(AppEvent) + Send + Sync>;
