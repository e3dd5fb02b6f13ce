use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{DownloadRequest, FormatChoice};
use crate::error::AppError;

/// Where settings.json lives:
///   ~/Library/Application Support/tube-downloader/settings.json (macOS)
///   ~/.config/tube-downloader/settings.json (Linux)
///   %APPDATA%\tube-downloader\settings.json (Windows)
pub fn app_support_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| dirs::home_dir().unwrap_or_default());
    base.join("tube-downloader")
}

fn settings_json_path() -> PathBuf {
    app_support_dir().join("settings.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub download_directory: String,
    pub default_format: FormatChoice,
    pub debug_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            download_directory: default_download_dir().to_string_lossy().to_string(),
            default_format: FormatChoice::VideoContainer,
            debug_logs: false,
        }
    }
}

impl Settings {
    /// A download request for `url` using this configuration's defaults.
    /// Validation still happens at start time.
    pub fn request_for(&self, url: impl Into<String>) -> DownloadRequest {
        DownloadRequest {
            url: url.into(),
            destination_dir: PathBuf::from(&self.download_directory),
            format: self.default_format,
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/"))
}

fn dir_is_writable(p: &Path) -> bool {
    if !p.exists() || !p.is_dir() {
        return false;
    }
    let test = p.join(format!(".writecheck-{}.tmp", Uuid::new_v4()));
    match fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&test)
    {
        Ok(_) => {
            let _ = fs::remove_file(test);
            true
        }
        Err(_) => false,
    }
}

/// Validate a candidate directory; an empty, relative, uncreatable, or
/// read-only path falls back to the platform Downloads folder.
fn validated_download_dir<S: Into<String>>(candidate: S) -> String {
    let cand = candidate.into();
    let mut path = PathBuf::from(cand.trim());

    if path.as_os_str().is_empty() || !path.is_absolute() {
        path = default_download_dir();
    }

    if !path.exists() && fs::create_dir_all(&path).is_err() {
        path = default_download_dir();
        let _ = fs::create_dir_all(&path);
    }

    if !dir_is_writable(&path) {
        let fallback = default_download_dir();
        let _ = fs::create_dir_all(&fallback);
        return fallback.to_string_lossy().to_string();
    }

    path.to_string_lossy().to_string()
}

/// Load settings from JSON, validate the download path, and persist any
/// fixups (which also migrates an old or invalid file).
pub fn load_settings() -> Settings {
    let path = settings_json_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut settings = match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str::<Settings>(&s).unwrap_or_default(),
        Err(_) => Settings::default(),
    };

    let fixed_dir = validated_download_dir(&settings.download_directory);
    if settings.download_directory != fixed_dir {
        settings.download_directory = fixed_dir;
    }

    let _ = fs::write(
        &path,
        serde_json::to_string_pretty(&settings).unwrap_or_else(|_| "{}".into()),
    );

    settings
}

/// Save settings back to JSON, re-validating the download directory first.
pub fn save_settings(settings: &Settings) -> Result<(), AppError> {
    let path = settings_json_path();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Persistence(format!("failed to create settings dir: {e}")))?;
    }

    let to_write = Settings {
        download_directory: validated_download_dir(&settings.download_directory),
        default_format: settings.default_format,
        debug_logs: settings.debug_logs,
    };

    let body = serde_json::to_string_pretty(&to_write)
        .map_err(|e| AppError::Persistence(format!("failed to serialize settings: {e}")))?;
    fs::write(&path, body)
        .map_err(|e| AppError::Persistence(format!("failed to write settings.json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_candidate_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cand = dir.path().to_string_lossy().to_string();
        assert_eq!(validated_download_dir(&cand), cand);
    }

    #[test]
    fn empty_candidate_falls_back() {
        let fixed = validated_download_dir("");
        assert!(!fixed.is_empty());
        assert!(Path::new(&fixed).is_absolute());
    }

    #[test]
    fn missing_candidate_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let cand = dir.path().join("nested").join("downloads");
        let fixed = validated_download_dir(cand.to_string_lossy().to_string());
        assert_eq!(PathBuf::from(fixed), cand);
        assert!(cand.is_dir());
    }

    #[test]
    fn request_for_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            download_directory: dir.path().to_string_lossy().to_string(),
            default_format: FormatChoice::AudioOnly,
            debug_logs: false,
        };
        let request = settings.request_for("https://youtu.be/x");
        assert_eq!(request.destination_dir, dir.path());
        assert_eq!(request.format, FormatChoice::AudioOnly);
    }
}
