//! Per-column filtering of flattened records.

use std::collections::HashMap;

use crate::flatten::{FlatRecord, value_text};

/// Column name → substring filter. An empty string imposes no constraint,
/// so clearing a filter and removing it are equivalent.
#[derive(Clone, Default)]
pub struct ColumnFilters {
    filters: HashMap<String, String>,
}

impl ColumnFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, text: String) {
        if text.is_empty() {
            self.filters.remove(column);
        } else {
            self.filters.insert(column.to_string(), text);
        }
    }

    pub fn get(&self, column: &str) -> &str {
        self.filters.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn clear(&mut self, column: &str) {
        self.filters.remove(column);
    }

    pub fn clear_all(&mut self) {
        self.filters.clear();
    }

    /// Number of columns with a non-empty filter.
    pub fn active_count(&self) -> usize {
        self.filters.values().filter(|t| !t.is_empty()).count()
    }

    /// Case-insensitive substring match across every filtered column. A
    /// missing column is compared as the empty string.
    pub fn matches(&self, record: &FlatRecord) -> bool {
        self.filters.iter().all(|(column, needle)| {
            if needle.is_empty() {
                return true;
            }
            let value = value_text(record.get(column)).to_lowercase();
            value.contains(&needle.to_lowercase())
        })
    }

    /// Summary like `severity=high type=event` for the status line.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(c, t)| format!("{c}={t}"))
            .collect();
        parts.sort();
        parts.join(" ")
    }
}

/// Indices of the records that pass the filters, in input order.
pub fn matching_indices(records: &[FlatRecord], filters: &ColumnFilters) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filters.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_record;
    use serde_json::json;

    fn flat(value: serde_json::Value) -> FlatRecord {
        match value {
            serde_json::Value::Object(map) => flatten_record(&map, "."),
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn case_insensitive_substring_match() {
        let records = vec![
            flat(json!({"severity": "High", "name": "A"})),
            flat(json!({"severity": "low", "name": "B"})),
        ];
        let mut filters = ColumnFilters::new();
        filters.set("severity", "high".to_string());
        assert_eq!(matching_indices(&records, &filters), vec![0]);
    }

    #[test]
    fn missing_column_is_empty_string() {
        let records = vec![flat(json!({"name": "A"}))];
        let mut filters = ColumnFilters::new();
        filters.set("severity", "high".to_string());
        assert!(matching_indices(&records, &filters).is_empty());
    }

    #[test]
    fn empty_filter_imposes_no_constraint() {
        let records = vec![flat(json!({"name": "A"}))];
        let mut filters = ColumnFilters::new();
        filters.set("severity", String::new());
        assert_eq!(matching_indices(&records, &filters), vec![0]);
        assert_eq!(filters.active_count(), 0);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            flat(json!({"type": "event", "id": 1})),
            flat(json!({"type": "Event", "id": 2})),
            flat(json!({"type": "audit", "id": 3})),
        ];
        let mut filters = ColumnFilters::new();
        filters.set("type", "event".to_string());

        let once = matching_indices(&records, &filters);
        let survivors: Vec<FlatRecord> =
            once.iter().map(|&i| records[i].clone()).collect();
        let twice = matching_indices(&survivors, &filters);
        assert_eq!(once.len(), twice.len());
        assert_eq!(twice, vec![0, 1]);
    }

    #[test]
    fn filters_apply_to_flattened_paths() {
        let records = vec![
            flat(json!({"source_info": {"ip": "10.0.0.1"}})),
            flat(json!({"source_info": {"ip": "192.168.1.9"}})),
        ];
        let mut filters = ColumnFilters::new();
        filters.set("source_info.ip", "10.0".to_string());
        assert_eq!(matching_indices(&records, &filters), vec![0]);
    }

    #[test]
    fn non_string_values_match_on_display_form() {
        let records = vec![flat(json!({"id": 1234}))];
        let mut filters = ColumnFilters::new();
        filters.set("id", "23".to_string());
        assert_eq!(matching_indices(&records, &filters), vec![0]);
    }
}
