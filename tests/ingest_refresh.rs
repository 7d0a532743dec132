//! File-backed tests for full and incremental loading.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use tablog::filter::{ColumnFilters, matching_indices};
use tablog::flatten::flatten_record;
use tablog::ingest::{LoadError, RecordCache};

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn append(path: &Path, content: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

#[test]
fn full_load_of_json_array_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "events.json",
        r#"[{"severity":"High","name":"A"},{"severity":"low","name":"B"},{"severity":"medium","name":"C"}]"#,
    );

    let mut cache = RecordCache::new();
    let (records, total_lines) = cache.load_full(&path, None).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["name"], "A");
    assert_eq!(records[2]["name"], "C");
    assert_eq!(total_lines, 1);
    assert_eq!(cache.records(&path).unwrap().len(), 3);
}

#[test]
fn jsonl_fallback_keeps_line_order() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "events.jsonl",
        "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n",
    );

    let mut cache = RecordCache::new();
    let (records, total_lines) = cache.load_full(&path, None).unwrap();
    assert_eq!(total_lines, 3);
    let ns: Vec<i64> = records.iter().map(|r| r["n"].as_i64().unwrap()).collect();
    assert_eq!(ns, vec![1, 2, 3]);
}

#[test]
fn incremental_load_appends_only_the_suffix() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "events.jsonl", "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");

    let mut cache = RecordCache::new();
    let (_, seen) = cache.load_full(&path, None).unwrap();
    assert_eq!(seen, 3);

    append(&path, "{\"n\":4}\n{\"n\":5}\n");
    let (new_records, total) = cache.load_incremental(&path, seen, None).unwrap();

    let ns: Vec<i64> = new_records
        .iter()
        .map(|r| r["n"].as_i64().unwrap())
        .collect();
    assert_eq!(ns, vec![4, 5]);
    assert_eq!(total, 5);

    // The cached prefix is untouched and the suffix appended in order.
    let cached = cache.records(&path).unwrap();
    let all: Vec<i64> = cached.iter().map(|r| r["n"].as_i64().unwrap()).collect();
    assert_eq!(all, vec![1, 2, 3, 4, 5]);
}

#[test]
fn incremental_load_tolerates_zero_new_lines() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "events.jsonl", "{\"n\":1}\n{\"n\":2}\n");

    let mut cache = RecordCache::new();
    let (_, seen) = cache.load_full(&path, None).unwrap();

    let (new_records, total) = cache.load_incremental(&path, seen, None).unwrap();
    assert!(new_records.is_empty());
    assert_eq!(total, seen);
    assert_eq!(cache.records(&path).unwrap().len(), 2);
}

#[test]
fn malformed_suffix_line_aborts_without_touching_cache() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "events.jsonl", "{\"n\":1}\n{\"n\":2}\n");

    let mut cache = RecordCache::new();
    let (_, seen) = cache.load_full(&path, None).unwrap();

    append(&path, "{\"n\":3}\nnot json{\n{\"n\":5}\n");
    let err = cache.load_incremental(&path, seen, None).unwrap_err();
    assert!(matches!(err, LoadError::InvalidFormat(_)));

    // Previously cached records survive the failed refresh.
    assert_eq!(cache.records(&path).unwrap().len(), 2);
}

#[test]
fn incremental_load_creates_missing_cache_entry() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "events.jsonl", "{\"n\":1}\n{\"n\":2}\n");

    let mut cache = RecordCache::new();
    let (new_records, total) = cache.load_incremental(&path, 0, None).unwrap();
    assert_eq!(new_records.len(), 2);
    assert_eq!(total, 2);
    assert_eq!(cache.records(&path).unwrap().len(), 2);
}

#[test]
fn missing_file_is_an_io_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.jsonl");

    let mut cache = RecordCache::new();
    let err = cache.load_full(&path, None).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn loaded_records_filter_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "events.json",
        r#"[{"severity":"High","name":"A"},{"severity":"low","name":"B"}]"#,
    );

    let mut cache = RecordCache::new();
    let (records, _) = cache.load_full(&path, None).unwrap();
    let rows: Vec<_> = records.iter().map(|r| flatten_record(r, ".")).collect();

    let mut filters = ColumnFilters::new();
    filters.set("severity", "high".to_string());
    let visible = matching_indices(&rows, &filters);
    assert_eq!(visible, vec![0]);
    assert_eq!(rows[visible[0]]["name"], "A");
}
