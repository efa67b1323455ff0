//! CSV export of uniform records.
//!
//! The header comes from the first record's keys, in order. Every other
//! record must carry exactly the same keys (in any order).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use cis_core::ExportError;
use serde::Serialize;
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

const DELIMITER: char = ',';

/// Turn serializable items into export records. Each item must serialize to a JSON object.
pub fn to_records<T: Serialize>(items: &[T]) -> Result<Vec<Record>, ExportError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match serde_json::to_value(item) {
            Ok(Value::Object(record)) => Ok(record),
            _ => Err(ExportError::NotARecord { index }),
        })
        .collect()
}

/// Serialize records to CSV text. An empty slice yields an empty string.
pub fn records_to_csv(records: &[Record]) -> Result<String, ExportError> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };

    let header: Vec<&String> = first.keys().collect();
    let expected: BTreeSet<&String> = header.iter().copied().collect();

    let mut out = String::new();
    push_line(&mut out, header.iter().map(|k| escape_field(k)));

    for (index, record) in records.iter().enumerate() {
        let found: BTreeSet<&String> = record.keys().collect();
        if found != expected {
            return Err(ExportError::NonUniform {
                index,
                expected: header.iter().map(|k| k.to_string()).collect(),
                found: record.keys().cloned().collect(),
            });
        }

        push_line(
            &mut out,
            header
                .iter()
                .map(|key| escape_field(&field_text(record.get(*key).unwrap_or(&Value::Null)))),
        );
    }

    Ok(out)
}

/// Write records to `filename` as UTF-8 CSV, adding a `.csv` extension when missing.
///
/// Returns the path actually written.
pub fn export_csv(records: &[Record], filename: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
    let csv = records_to_csv(records)?;
    let path = with_csv_extension(filename.as_ref());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, csv)?;

    tracing::info!("Exported {} rows to {:?}", records.len(), path);
    Ok(path)
}

fn with_csv_extension(path: &Path) -> PathBuf {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".csv");
        PathBuf::from(name)
    }
}

fn push_line(out: &mut String, fields: impl Iterator<Item = String>) {
    let line = fields.collect::<Vec<_>>().join(&DELIMITER.to_string());
    out.push_str(&line);
    out.push('\n');
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested values are kept as compact JSON in a single cell.
        other => other.to_string(),
    }
}

fn escape_field(field: &str) -> String {
    let needs_quotes = field.contains(DELIMITER)
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r');

    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_comma_field_is_quoted() {
        let rows = records(json!([
            {"name": "A,B", "val": 1},
            {"name": "C", "val": 2}
        ]));

        let csv = records_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["name,val", "\"A,B\",1", "C,2"]);
    }

    #[test]
    fn test_quotes_and_newlines_are_escaped() {
        let rows = records(json!([
            {"message": "Rain \"expected\" today", "note": "line1\nline2"}
        ]));

        let csv = records_to_csv(&rows).unwrap();
        assert_eq!(
            csv,
            "message,note\n\"Rain \"\"expected\"\" today\",\"line1\nline2\"\n"
        );
    }

    #[test]
    fn test_header_follows_first_record_key_order() {
        let rows = records(json!([
            {"phone": "0788000000", "name": "Uwase"},
            {"name": "Habimana", "phone": "0788111111"}
        ]));

        let csv = records_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "phone,name");
        assert_eq!(lines[2], "0788111111,Habimana");
    }

    #[test]
    fn test_null_and_nested_values() {
        let rows = records(json!([
            {"name": "Uwase", "location": null, "crops": ["maize", "beans"], "active": true}
        ]));

        let csv = records_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "Uwase,,\"[\"\"maize\"\",\"\"beans\"\"]\",true");
    }

    #[test]
    fn test_non_uniform_records_fail() {
        let rows = records(json!([
            {"name": "A", "val": 1},
            {"name": "B", "other": 2}
        ]));

        match records_to_csv(&rows) {
            Err(ExportError::NonUniform { index, expected, found }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, vec!["name", "val"]);
                assert_eq!(found, vec!["name", "other"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(records_to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn test_to_records_rejects_scalars() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
        }

        assert_eq!(to_records(&[Row { id: 1 }]).unwrap().len(), 1);
        assert!(matches!(
            to_records(&[1, 2]),
            Err(ExportError::NotARecord { index: 0 })
        ));
    }

    #[test]
    fn test_export_writes_file_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let rows = records(json!([{"name": "Mukamana", "district": "Musanze"}]));

        let written = export_csv(&rows, dir.path().join("farmers")).unwrap();
        assert_eq!(written, dir.path().join("farmers.csv"));
        assert_eq!(
            std::fs::read_to_string(&written).unwrap(),
            "name,district\nMukamana,Musanze\n"
        );

        let explicit = export_csv(&rows, dir.path().join("report.CSV")).unwrap();
        assert_eq!(explicit, dir.path().join("report.CSV"));
    }
}
