use chrono::{TimeZone, Utc};

use tube_downloader::engine::FormatChoice;
use tube_downloader::history::{HistoryEntry, HistoryLedger, HISTORY_LIMIT};

fn entry(n: usize) -> HistoryEntry {
    HistoryEntry {
        title: format!("Video {n}"),
        source_url: format!("https://youtu.be/{n}"),
        format: FormatChoice::VideoContainer,
        completed_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
    }
}

#[test]
fn entry_details_show_format_and_date() {
    assert_eq!(entry(1).details(), "mp4 • 2026-08-07 12:00:00");
}

#[test]
fn missing_file_yields_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = HistoryLedger::load(dir.path().join("history.json"));
    assert!(ledger.is_empty());
}

#[test]
fn corrupt_file_yields_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "{not json at all").unwrap();
    let ledger = HistoryLedger::load(path);
    assert!(ledger.is_empty());
}

#[test]
fn wrong_shape_yields_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, r#"{"title":"not an array"}"#).unwrap();
    let ledger = HistoryLedger::load(path);
    assert!(ledger.is_empty());
}

#[test]
fn append_inserts_newest_first_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let mut ledger = HistoryLedger::load(path.clone());
    ledger.append(entry(1));
    ledger.append(entry(2));
    assert_eq!(ledger.entries()[0].title, "Video 2");
    assert_eq!(ledger.entries()[1].title, "Video 1");

    // A fresh load sees the same sequence.
    let reloaded = HistoryLedger::load(path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.entries()[0].title, "Video 2");
}

#[test]
fn twenty_first_append_evicts_the_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let mut ledger = HistoryLedger::load(path.clone());
    for n in 0..HISTORY_LIMIT {
        ledger.append(entry(n));
    }
    assert_eq!(ledger.len(), HISTORY_LIMIT);

    ledger.append(entry(999));
    assert_eq!(ledger.len(), HISTORY_LIMIT);
    assert_eq!(ledger.entries()[0].title, "Video 999");
    assert!(
        ledger.entries().iter().all(|e| e.title != "Video 0"),
        "oldest entry must be evicted"
    );

    let reloaded = HistoryLedger::load(path);
    assert_eq!(reloaded.len(), HISTORY_LIMIT);
    assert_eq!(reloaded.entries()[0].title, "Video 999");
}

#[test]
fn oversized_persisted_file_is_truncated_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let entries: Vec<HistoryEntry> = (0..HISTORY_LIMIT + 5).map(entry).collect();
    std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

    let ledger = HistoryLedger::load(path);
    assert_eq!(ledger.len(), HISTORY_LIMIT);
    assert_eq!(ledger.entries()[0].title, "Video 0");
}

#[test]
fn unwritable_path_keeps_memory_copy() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file, not dir").unwrap();

    let mut ledger = HistoryLedger::load(blocker.join("history.json"));
    ledger.append(entry(1));
    assert_eq!(ledger.len(), 1);
    assert!(ledger.persist().is_err());
}
