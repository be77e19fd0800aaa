pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pretty-print JSON to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// The computation payload: the `result` of an envelope, or the value itself.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Scalar fields of an object as `(path, text)` pairs; nested objects are
/// flattened with dotted paths, arrays of objects are skipped (they are
/// rendered as their own tables).
pub fn flatten_scalars(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_scalars(&path, val, out);
            }
        }
        Value::Array(arr) if arr.iter().any(Value::is_object) => {}
        _ => out.push((prefix.to_string(), format_value(value))),
    }
}

/// Arrays of objects inside a result, keyed by field name.
pub fn object_arrays(value: &Value) -> Vec<(&str, &[Value])> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, val)| match val {
                Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_object) => {
                    Some((key.as_str(), arr.as_slice()))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_breakdown() {
        let v = json!({
            "tae": "6.157",
            "breakdown": { "principal": "10000", "interest": "1596.89" },
            "expense_lines": [{ "id": "1" }],
            "monthly_irr": null
        });
        let mut out = Vec::new();
        flatten_scalars("", &v, &mut out);
        assert!(out.contains(&("tae".to_string(), "6.157".to_string())));
        assert!(out.contains(&("breakdown.interest".to_string(), "1596.89".to_string())));
        assert!(out.contains(&("monthly_irr".to_string(), "null".to_string())));
        assert!(!out.iter().any(|(k, _)| k == "expense_lines"));
    }

    #[test]
    fn test_object_arrays_and_result_of() {
        let envelope = json!({
            "result": { "rows": [{ "month": 1 }], "schedule": [], "monthly_quota": "10" },
            "warnings": []
        });
        let result = result_of(&envelope);
        let arrays = object_arrays(result);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].0, "rows");
    }
}
