use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::engine::{
    DownloadRequest, Extractor, FetchOutcome, FormatChoice, Metadata, ProgressHook, RawProgress,
    RawStatus,
};
use crate::error::AppError;

/// No output for this long and the subprocess is considered stalled.
const STALL_TIMEOUT: Duration = Duration::from_secs(180);

/// Machine-readable progress lines; `NA` stands in for unknown fields.
const PROGRESS_TEMPLATE: &str = "download:progress|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.speed)s|%(progress.eta)s";

/// Production extractor: drives a `yt-dlp` binary.
///
/// Probing runs `--dump-single-json` and parses the document; fetching
/// streams `--newline` output, forwarding progress-template lines through
/// the hook and capturing the printed title/filepath for the outcome.
pub struct YtDlp {
    binary: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn probe(&self, url: &str) -> Result<Metadata, AppError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "--dump-single-json",
            "--no-warnings",
            "--no-playlist",
            "--skip-download",
            url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let output = timeout(STALL_TIMEOUT, cmd.output())
            .await
            .map_err(|_| AppError::Probe("yt-dlp timed out".into()))?
            .map_err(|e| AppError::Probe(format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Probe(last_error_line(&stderr)));
        }

        let doc: ProbeDoc = serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::Probe(format!("yt-dlp returned invalid JSON: {e}")))?;
        Ok(doc.into_metadata())
    }

    async fn fetch(
        &self,
        request: &DownloadRequest,
        on_progress: ProgressHook,
    ) -> Result<FetchOutcome, AppError> {
        tokio::fs::create_dir_all(&request.destination_dir)
            .await
            .map_err(|e| AppError::Fetch(format!("failed to create download dir: {e}")))?;

        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--print".into(),
            "pre_process:title=%(title)s".into(),
            "--print".into(),
            "after_move:filepath=%(filepath)s".into(),
            "--no-quiet".into(),
            "-P".into(),
            request.destination_dir.to_string_lossy().into_owned(),
            "-o".into(),
            "%(title)s.%(ext)s".into(),
        ];
        args.extend(format_args(request.format));
        args.push(request.url.clone());

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Fetch(format!("failed to spawn yt-dlp: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Fetch("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Fetch("yt-dlp stderr unavailable".into()))?;

        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        let mut title: Option<String> = None;
        let mut output_path: Option<PathBuf> = None;
        let mut lines = BufReader::new(stdout).lines();
        loop {
            let line = match timeout(STALL_TIMEOUT, lines.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(AppError::Fetch(format!("yt-dlp output error: {e}"))),
                Err(_) => {
                    return Err(AppError::Fetch("yt-dlp stalled (no output for 180s)".into()))
                }
            };
            let line = line.trim();
            if let Some(raw) = parse_progress_line(line) {
                (on_progress)(raw);
            } else if let Some(value) = line.strip_prefix("title=") {
                title = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("filepath=") {
                output_path = Some(PathBuf::from(value));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AppError::Fetch(format!("yt-dlp process failed: {e}")))?;
        let stderr_content = stderr_reader.await.unwrap_or_default();

        if status.success() {
            Ok(FetchOutcome { title, output_path })
        } else {
            Err(AppError::Fetch(last_error_line(&stderr_content)))
        }
    }
}

/* --------------------------- argument mapping ---------------------------- */

fn format_args(format: FormatChoice) -> Vec<String> {
    match format {
        FormatChoice::VideoContainer => vec!["-f".into(), "best[ext=mp4]".into()],
        FormatChoice::AudioOnly => vec![
            "-x".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            "192K".into(),
        ],
        FormatChoice::SourceNative => vec!["-f".into(), "best".into()],
    }
}

/* ------------------------------ line parsing ------------------------------ */

fn parse_progress_line(line: &str) -> Option<RawProgress> {
    let rest = line.strip_prefix("progress|")?;
    let mut fields = rest.split('|');
    let status = match fields.next()? {
        "downloading" => RawStatus::Downloading,
        "finished" => RawStatus::Finished,
        _ => return None,
    };
    let downloaded_bytes = parse_count(fields.next());
    let total_bytes = parse_count(fields.next());
    let rate_bytes_per_sec = parse_float(fields.next());
    let eta_seconds = parse_count(fields.next());
    Some(RawProgress {
        status,
        downloaded_bytes,
        total_bytes,
        rate_bytes_per_sec,
        eta_seconds,
    })
}

fn parse_count(field: Option<&str>) -> Option<u64> {
    // yt-dlp renders unknown fields as NA; byte counts can come out as
    // floats ("1024.0").
    parse_float(field).map(|v| v.max(0.0) as u64)
}

fn parse_float(field: Option<&str>) -> Option<f64> {
    let field = field?.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("na") || field == "null" {
        return None;
    }
    field.parse::<f64>().ok()
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find_map(|line| {
            let line = line.trim();
            line.strip_prefix("ERROR:").map(|rest| rest.trim().to_string())
        })
        .or_else(|| {
            stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "yt-dlp exited with an error".into())
}

/* ------------------------------ probe parsing ----------------------------- */

#[derive(Debug, Deserialize)]
struct ProbeDoc {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl ProbeDoc {
    fn into_metadata(self) -> Metadata {
        Metadata {
            title: self.title.unwrap_or_else(|| "Unknown Title".into()),
            duration_seconds: self.duration.filter(|d| *d >= 0.0).map(|d| d as u64),
            thumbnail_url: self.thumbnail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_progress_downloading() {
        let raw =
            parse_progress_line("progress|downloading|2500|10000|524288.0|17").expect("progress");
        assert_eq!(raw.status, RawStatus::Downloading);
        assert_eq!(raw.downloaded_bytes, Some(2500));
        assert_eq!(raw.total_bytes, Some(10000));
        assert_eq!(raw.rate_bytes_per_sec, Some(524288.0));
        assert_eq!(raw.eta_seconds, Some(17));
    }

    #[test]
    fn parse_progress_na_fields() {
        let raw = parse_progress_line("progress|downloading|1024.0|NA|NA|NA").expect("progress");
        assert_eq!(raw.downloaded_bytes, Some(1024));
        assert_eq!(raw.total_bytes, None);
        assert_eq!(raw.rate_bytes_per_sec, None);
        assert_eq!(raw.eta_seconds, None);
    }

    #[test]
    fn parse_progress_finished() {
        let raw = parse_progress_line("progress|finished|10000|10000|NA|0").expect("progress");
        assert_eq!(raw.status, RawStatus::Finished);
    }

    #[test]
    fn parse_progress_rejects_other_lines() {
        assert!(parse_progress_line("[download] Destination: /tmp/v.mp4").is_none());
        assert!(parse_progress_line("title=Some Video").is_none());
        assert!(parse_progress_line("progress|postprocessing|1|2|3|4").is_none());
    }

    #[test]
    fn probe_doc_maps_fields() {
        let doc: ProbeDoc = serde_json::from_str(
            r#"{"title":"A Video","duration":212.4,"thumbnail":"https://i.ytimg.com/vi/x/hq720.jpg","id":"x"}"#,
        )
        .unwrap();
        let meta = doc.into_metadata();
        assert_eq!(meta.title, "A Video");
        assert_eq!(meta.duration_seconds, Some(212));
        assert_eq!(
            meta.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/x/hq720.jpg")
        );
    }

    #[test]
    fn probe_doc_tolerates_missing_fields() {
        let doc: ProbeDoc = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        let meta = doc.into_metadata();
        assert_eq!(meta.title, "Unknown Title");
        assert_eq!(meta.duration_seconds, None);
        assert_eq!(meta.thumbnail_url, None);
    }

    #[test]
    fn format_args_match_choices() {
        assert_eq!(
            format_args(FormatChoice::VideoContainer),
            vec!["-f", "best[ext=mp4]"]
        );
        assert_eq!(
            format_args(FormatChoice::AudioOnly),
            vec!["-x", "--audio-format", "mp3", "--audio-quality", "192K"]
        );
        assert_eq!(format_args(FormatChoice::SourceNative), vec!["-f", "best"]);
    }

    #[test]
    fn last_error_line_prefers_error_prefix() {
        let stderr = "WARNING: something\nERROR: Video unavailable\n";
        assert_eq!(last_error_line(stderr), "Video unavailable");
    }

    #[test]
    fn last_error_line_falls_back_to_last_line() {
        assert_eq!(last_error_line("plain failure\n"), "plain failure");
        assert_eq!(last_error_line(""), "yt-dlp exited with an error");
    }
}
