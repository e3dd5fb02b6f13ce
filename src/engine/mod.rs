pub mod ytdlp;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/* ----------------------------- shared types ------------------------------ */

/// What a metadata probe returns. Superseded wholesale by the next
/// successful probe; discarded when the input is cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
}

impl Metadata {
    /// `H:MM:SS` for hour-long videos, `M:SS` otherwise.
    pub fn duration_text(&self) -> Option<String> {
        let total = self.duration_seconds?;
        let (minutes, seconds) = (total / 60, total % 60);
        let (hours, minutes) = (minutes / 60, minutes % 60);
        if hours > 0 {
            Some(format!("{hours}:{minutes:02}:{seconds:02}"))
        } else {
            Some(format!("{minutes}:{seconds:02}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatChoice {
    /// Best stream already muxed into a common video container.
    VideoContainer,
    /// Best audio stream, transcoded to a fixed codec/bitrate.
    AudioOnly,
    /// Best available stream, no constraint.
    SourceNative,
}

impl FormatChoice {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VideoContainer => "mp4",
            Self::AudioOnly => "mp3",
            Self::SourceNative => "original",
        }
    }
}

/// Everything one download needs. Immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination_dir: PathBuf,
    pub format: FormatChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawStatus {
    Downloading,
    Finished,
}

/// One raw progress callback from the engine, as loosely shaped as the
/// engine reports it. The progress reducer turns these into display state.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProgress {
    pub status: RawStatus,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub rate_bytes_per_sec: Option<f64>,
    pub eta_seconds: Option<u64>,
}

/// What a finished fetch reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub title: Option<String>,
    pub output_path: Option<PathBuf>,
}

/// Progress callbacks are invoked from worker context; implementations must
/// not touch shared state directly.
pub type ProgressHook = Arc<dyn Fn(RawProgress) + Send + Sync>;

/* -------------------------------- the port -------------------------------- */

/// The extraction/download collaborator, treated as opaque: a no-download
/// metadata probe plus a fetch that streams progress through a hook.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Metadata, AppError>;

    async fn fetch(
        &self,
        request: &DownloadRequest,
        on_progress: ProgressHook,
    ) -> Result<FetchOutcome, AppError>;
}
