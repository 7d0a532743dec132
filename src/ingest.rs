//! Log file ingestion.
//!
//! A log file is either one JSON document (an array of objects, or a single
//! object) or JSON-Lines (one object per non-empty line). Parsed records are
//! cached per file path so the detail view and incremental refresh can work
//! against the same data without rereading the whole file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

/// One parsed log entry. Identity is positional (line index in the file).
pub type Record = serde_json::Map<String, Value>;

/// Optional observer for long-running loads, called with a fraction in [0,1]
/// proportional to lines consumed.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64);

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid log format: {0}")]
    InvalidFormat(String),
    #[error("no valid records found")]
    EmptyResult,
}

/// Parse file content as a single JSON document, falling back to JSON-Lines.
///
/// Returns the records plus the total line count of the (trimmed) content.
/// The line count is what incremental refresh later uses to find the unread
/// suffix, so it counts every line, not just the ones that produced records.
pub fn parse_content(
    content: &str,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<(Vec<Record>, usize), LoadError> {
    let content = content.trim();
    let total_lines = content.lines().count();

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => {
            let mut records = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(map) => records.push(map),
                    other => {
                        return Err(LoadError::InvalidFormat(format!(
                            "array element {i} is not an object (found {})",
                            json_type_name(&other)
                        )));
                    }
                }
            }
            if let Some(cb) = progress.as_mut() {
                cb(1.0);
            }
            Ok((records, total_lines))
        }
        Ok(Value::Object(map)) => {
            if let Some(cb) = progress.as_mut() {
                cb(1.0);
            }
            Ok((vec![map], total_lines))
        }
        Ok(other) => Err(LoadError::InvalidFormat(format!(
            "top-level JSON must be an object or an array of objects (found {})",
            json_type_name(&other)
        ))),
        // Not one JSON document; try one object per line.
        Err(_) => {
            let records = parse_record_lines(content.lines(), total_lines, progress)?;
            if records.is_empty() {
                return Err(LoadError::EmptyResult);
            }
            Ok((records, total_lines))
        }
    }
}

/// Parse lines as JSON-Lines. Empty lines are skipped, valid non-object
/// values are dropped, and a line that is not valid JSON fails the whole
/// parse. `total` is only used for progress reporting.
fn parse_record_lines<'a>(
    lines: impl Iterator<Item = &'a str>,
    total: usize,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if !line.is_empty() {
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(map)) => records.push(map),
                Ok(_) => {}
                Err(e) => {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {} is not valid JSON: {e}",
                        i + 1
                    )));
                }
            }
        }
        if let Some(cb) = progress.as_mut() {
            if total > 0 {
                cb((i + 1) as f64 / total as f64);
            }
        }
    }
    Ok(records)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// In-memory record cache, keyed by file path. Lives for the process
/// lifetime; nothing is persisted.
#[derive(Default)]
pub struct RecordCache {
    entries: HashMap<PathBuf, Vec<Record>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached records for a path, if any.
    pub fn records(&self, path: &Path) -> Option<&[Record]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Full load: parse the whole file and replace any prior cache entry.
    pub fn load_full(
        &mut self,
        path: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<(Vec<Record>, usize), LoadError> {
        let content = read_file(path)?;
        let (records, total_lines) = parse_content(&content, progress)?;
        info!(
            "full load of {}: {} records, {} lines",
            path.display(),
            records.len(),
            total_lines
        );
        self.entries.insert(path.to_path_buf(), records.clone());
        Ok((records, total_lines))
    }

    /// Incremental load: parse only the lines after `seen_lines` and append
    /// the results to the cache entry (creating it if absent).
    ///
    /// Returns the new records and the new total line count. A parse failure
    /// in the suffix aborts the whole load and leaves the cache untouched.
    pub fn load_incremental(
        &mut self,
        path: &Path,
        seen_lines: usize,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<(Vec<Record>, usize), LoadError> {
        let content = read_file(path)?;
        let content = content.trim();
        let total_lines = content.lines().count();

        if total_lines <= seen_lines {
            if total_lines < seen_lines {
                warn!(
                    "{} shrank from {} to {} lines; keeping cached records",
                    path.display(),
                    seen_lines,
                    total_lines
                );
            }
            return Ok((Vec::new(), total_lines));
        }

        let unread = total_lines - seen_lines;
        let new_records =
            parse_record_lines(content.lines().skip(seen_lines), unread, progress)?;
        info!(
            "incremental load of {}: {} new records from {} new lines",
            path.display(),
            new_records.len(),
            unread
        );
        self.entries
            .entry(path.to_path_buf())
            .or_default()
            .extend(new_records.iter().cloned());
        Ok((new_records, total_lines))
    }
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array_in_order() {
        let content = r#"[{"name":"a"},{"name":"b"},{"name":"c"}]"#;
        let (records, total_lines) = parse_content(content, None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["name"], "a");
        assert_eq!(records[2]["name"], "c");
        assert_eq!(total_lines, 1);
    }

    #[test]
    fn wraps_single_object_in_one_element_list() {
        let (records, _) = parse_content(r#"{"severity":"low"}"#, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["severity"], "low");
    }

    #[test]
    fn rejects_array_with_non_object_element() {
        let err = parse_content(r#"[{"a":1}, 42]"#, None).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_top_level_scalar() {
        let err = parse_content("42", None).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(_)));
    }

    #[test]
    fn falls_back_to_json_lines() {
        let content = "{\"n\":1}\n{\"n\":2}\n\n{\"n\":3}";
        let (records, total_lines) = parse_content(content, None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["n"], 2);
        assert_eq!(total_lines, 4);
    }

    #[test]
    fn malformed_line_fails_the_whole_load() {
        let content = "{\"n\":1}\n{\"n\":2}\nnot json{\n{\"n\":4}\n{\"n\":5}";
        let err = parse_content(content, None).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFormat(_)));
    }

    #[test]
    fn zero_records_is_empty_result() {
        // Valid JSON on every line but nothing object-typed.
        let err = parse_content("1\n2\n3", None).unwrap_err();
        assert!(matches!(err, LoadError::EmptyResult));
    }

    #[test]
    fn progress_reaches_one() {
        let mut last = 0.0;
        let mut cb = |f: f64| last = f;
        let content = "{\"n\":1}\n{\"n\":2}";
        parse_content(content, Some(&mut cb)).unwrap();
        assert!((last - 1.0).abs() < f64::EPSILON);
    }
}
