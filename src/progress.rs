use serde::Serialize;

use crate::engine::{RawProgress, RawStatus};

/// Display phase of the current session's progress.
///
/// `Finalizing` covers the gap between "bytes fully received" and the fetch
/// call itself returning (post-processing, muxing). `Done` is only set once
/// the fetch resolves successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Finalizing,
    Done,
    Failed,
}

/// Latest display-ready progress record. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    /// `None` means indeterminate (total size unknown).
    pub fraction: Option<f32>,
    pub rate_bytes_per_sec: Option<f64>,
    pub eta_seconds: Option<u64>,
}

impl ProgressSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            fraction: None,
            rate_bytes_per_sec: None,
            eta_seconds: None,
        }
    }

    pub fn rate_text(&self) -> String {
        match self.rate_bytes_per_sec {
            Some(rate) => format!("{:.2} MB/s", rate / 1024.0 / 1024.0),
            None => "-- MB/s".to_string(),
        }
    }

    /// A zero ETA renders the same as an absent one; the display does not
    /// distinguish "zero seconds left" from "unknown".
    pub fn eta_text(&self) -> String {
        match self.eta_seconds {
            Some(eta) if eta > 0 => format!("{eta} seconds remaining"),
            _ => "calculating...".to_string(),
        }
    }

    pub fn status_line(&self) -> String {
        match self.phase {
            Phase::Idle => "Ready to download".to_string(),
            Phase::Fetching => match self.fraction {
                Some(fraction) => format!(
                    "Downloading: {:.1}% ({}, {})",
                    fraction * 100.0,
                    self.rate_text(),
                    self.eta_text()
                ),
                None => format!("Downloading... ({}, {})", self.rate_text(), self.eta_text()),
            },
            Phase::Finalizing => "Download finished, processing file...".to_string(),
            Phase::Done => "Download completed successfully".to_string(),
            Phase::Failed => "Download failed".to_string(),
        }
    }
}

/// Folds raw engine samples into a monotonic snapshot for one session.
///
/// Samples report cumulative bytes and may arrive out of order or get
/// dropped; only the latest matters, and the fraction never moves backward.
#[derive(Debug)]
pub struct ProgressTracker {
    latest: ProgressSnapshot,
    peak_fraction: Option<f32>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            latest: ProgressSnapshot::idle(),
            peak_fraction: None,
        }
    }

    /// Forget the previous session's record.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn latest(&self) -> &ProgressSnapshot {
        &self.latest
    }

    pub fn observe(&mut self, raw: &RawProgress) -> ProgressSnapshot {
        let snapshot = match raw.status {
            RawStatus::Downloading => {
                let fraction = match (raw.downloaded_bytes, raw.total_bytes) {
                    (Some(done), Some(total)) if total > 0 => {
                        Some((done as f32 / total as f32).clamp(0.0, 1.0))
                    }
                    _ => None,
                };
                let fraction = match (fraction, self.peak_fraction) {
                    (Some(f), Some(peak)) => Some(f.max(peak)),
                    (Some(f), None) => Some(f),
                    (None, peak) => peak,
                };
                ProgressSnapshot {
                    phase: Phase::Fetching,
                    fraction,
                    rate_bytes_per_sec: raw.rate_bytes_per_sec,
                    eta_seconds: raw.eta_seconds,
                }
            }
            RawStatus::Finished => ProgressSnapshot {
                phase: Phase::Finalizing,
                fraction: Some(1.0),
                rate_bytes_per_sec: None,
                eta_seconds: None,
            },
        };
        if let Some(f) = snapshot.fraction {
            self.peak_fraction = Some(f);
        }
        self.latest = snapshot.clone();
        snapshot
    }

    /// Terminal snapshot once the fetch call itself returned successfully.
    pub fn mark_done(&mut self) -> ProgressSnapshot {
        self.latest = ProgressSnapshot {
            phase: Phase::Done,
            fraction: Some(1.0),
            rate_bytes_per_sec: None,
            eta_seconds: None,
        };
        self.latest.clone()
    }

    pub fn mark_failed(&mut self) -> ProgressSnapshot {
        self.latest = ProgressSnapshot {
            phase: Phase::Failed,
            fraction: self.latest.fraction,
            rate_bytes_per_sec: None,
            eta_seconds: None,
        };
        self.latest.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(done: Option<u64>, total: Option<u64>) -> RawProgress {
        RawProgress {
            status: RawStatus::Downloading,
            downloaded_bytes: done,
            total_bytes: total,
            rate_bytes_per_sec: None,
            eta_seconds: None,
        }
    }

    #[test]
    fn quarter_done() {
        let mut tracker = ProgressTracker::new();
        let snap = tracker.observe(&downloading(Some(250), Some(1000)));
        assert_eq!(snap.fraction, Some(0.25));
        assert_eq!(snap.phase, Phase::Fetching);
    }

    #[test]
    fn overshoot_clamps_to_one() {
        let mut tracker = ProgressTracker::new();
        let snap = tracker.observe(&downloading(Some(1500), Some(1000)));
        assert_eq!(snap.fraction, Some(1.0));
    }

    #[test]
    fn unknown_total_is_indeterminate() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.observe(&downloading(Some(10), None)).fraction, None);
        assert_eq!(
            tracker.observe(&downloading(Some(10), Some(0))).fraction,
            None
        );
    }

    #[test]
    fn out_of_order_sample_never_regresses() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&downloading(Some(800), Some(1000)));
        let snap = tracker.observe(&downloading(Some(300), Some(1000)));
        assert_eq!(snap.fraction, Some(0.8));
    }

    #[test]
    fn indeterminate_after_determinate_keeps_peak() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&downloading(Some(500), Some(1000)));
        let snap = tracker.observe(&downloading(Some(600), None));
        assert_eq!(snap.fraction, Some(0.5));
    }

    #[test]
    fn finished_is_finalizing_not_done() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&downloading(Some(1000), Some(1000)));
        let snap = tracker.observe(&RawProgress {
            status: RawStatus::Finished,
            downloaded_bytes: None,
            total_bytes: None,
            rate_bytes_per_sec: None,
            eta_seconds: None,
        });
        assert_eq!(snap.phase, Phase::Finalizing);
        assert_eq!(snap.fraction, Some(1.0));
        assert_eq!(tracker.mark_done().phase, Phase::Done);
    }

    #[test]
    fn rate_text_formats_megabytes() {
        let snap = ProgressSnapshot {
            phase: Phase::Fetching,
            fraction: Some(0.5),
            rate_bytes_per_sec: Some(2.5 * 1024.0 * 1024.0),
            eta_seconds: Some(17),
        };
        assert_eq!(snap.rate_text(), "2.50 MB/s");
        assert_eq!(snap.eta_text(), "17 seconds remaining");
    }

    #[test]
    fn missing_rate_uses_placeholder() {
        let snap = ProgressSnapshot::idle();
        assert_eq!(snap.rate_text(), "-- MB/s");
    }

    #[test]
    fn zero_and_absent_eta_both_calculate() {
        let mut snap = ProgressSnapshot::idle();
        assert_eq!(snap.eta_text(), "calculating...");
        snap.eta_seconds = Some(0);
        assert_eq!(snap.eta_text(), "calculating...");
    }

    #[test]
    fn status_line_includes_percent_rate_and_eta() {
        let snap = ProgressSnapshot {
            phase: Phase::Fetching,
            fraction: Some(0.421),
            rate_bytes_per_sec: Some(1024.0 * 1024.0),
            eta_seconds: Some(9),
        };
        assert_eq!(
            snap.status_line(),
            "Downloading: 42.1% (1.00 MB/s, 9 seconds remaining)"
        );
    }
}
