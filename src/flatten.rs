//! Flattening of nested records into dotted key paths for column display.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ingest::Record;

/// A record with nested objects merged into dotted key paths. Sorted keys
/// keep column discovery deterministic.
pub type FlatRecord = BTreeMap<String, Value>;

/// Recursively merge nested object keys into `parent.child` paths. Arrays
/// and scalars are leaves. Input is JSON, hence acyclic, so this terminates
/// on arbitrarily deep nesting.
pub fn flatten_record(record: &Record, sep: &str) -> FlatRecord {
    let mut flat = FlatRecord::new();
    for (key, value) in record {
        flatten_into(&mut flat, key.clone(), value, sep);
    }
    flat
}

fn flatten_into(flat: &mut FlatRecord, key: String, value: &Value, sep: &str) {
    match value {
        Value::Object(map) => {
            for (child, child_value) in map {
                flatten_into(flat, format!("{key}{sep}{child}"), child_value, sep);
            }
        }
        other => {
            flat.insert(key, other.clone());
        }
    }
}

/// Display form of a value in a table cell or filter comparison: strings
/// without quotes, missing/null as empty, everything else as compact JSON.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn flattens_nested_objects_to_dotted_paths() {
        let rec = record(json!({
            "source_info": {"ip": "10.0.0.1", "geo": {"country": "DE"}},
            "severity": "high"
        }));
        let flat = flatten_record(&rec, ".");
        assert_eq!(flat["source_info.ip"], "10.0.0.1");
        assert_eq!(flat["source_info.geo.country"], "DE");
        assert_eq!(flat["severity"], "high");
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn flat_result_has_no_object_values() {
        let rec = record(json!({"a": {"b": {"c": {"d": 1, "e": 2}}}, "f": 3}));
        let flat = flatten_record(&rec, ".");
        assert!(flat.values().all(|v| !v.is_object()));
        // One dotted key per distinct leaf path.
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn arrays_are_leaves() {
        let rec = record(json!({"tags": ["a", "b"], "n": 1}));
        let flat = flatten_record(&rec, ".");
        assert_eq!(flat["tags"], json!(["a", "b"]));
    }

    #[test]
    fn custom_separator() {
        let rec = record(json!({"a": {"b": 1}}));
        let flat = flatten_record(&rec, "/");
        assert!(flat.contains_key("a/b"));
    }

    #[test]
    fn value_text_forms() {
        assert_eq!(value_text(Some(&json!("plain"))), "plain");
        assert_eq!(value_text(Some(&json!(12))), "12");
        assert_eq!(value_text(Some(&json!(true))), "true");
        assert_eq!(value_text(Some(&Value::Null)), "");
        assert_eq!(value_text(None), "");
        assert_eq!(value_text(Some(&json!([1, 2]))), "[1,2]");
    }
}
