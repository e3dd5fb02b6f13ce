use thiserror::Error;

/// Failure taxonomy for the orchestration core.
///
/// Worker-side failures are always carried back to the core loop as values;
/// nothing in this crate panics across the worker boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any background work was dispatched.
    #[error("{0}")]
    Validation(String),

    /// Metadata lookup failed. Non-fatal; only the status line changes.
    #[error("metadata lookup failed: {0}")]
    Probe(String),

    /// Download/extraction failed. Releases the session, surfaced to the user.
    #[error("download failed: {0}")]
    Fetch(String),

    /// History read/write failed. Logged, never surfaced, never blocks.
    #[error("history persistence failed: {0}")]
    Persistence(String),

    /// Thumbnail retrieval or decoding failed. Logged, slot stays empty.
    #[error("thumbnail unavailable: {0}")]
    Thumbnail(String),

    /// A worker task died before producing a result (panic or abort).
    #[error("worker task failed: {0}")]
    Worker(String),
}
