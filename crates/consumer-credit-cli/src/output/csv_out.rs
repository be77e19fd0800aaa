use serde_json::Value;
use std::io;

use super::{flatten_scalars, object_arrays, result_of};

/// Write output as CSV to stdout.
///
/// Results carrying a list (amortisation rows, schedule, expense lines)
/// are written as that list, one record per element; otherwise as
/// `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let _ = write_csv(&mut wtr, result_of(value));
    let _ = wtr.flush();
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    if let Some((_, rows)) = preferred_list(result) {
        return write_array_csv(wtr, rows);
    }

    match result {
        Value::Array(arr) => write_array_csv(wtr, arr),
        _ => {
            let mut fields = Vec::new();
            flatten_scalars("", result, &mut fields);
            wtr.write_record(["field", "value"])?;
            for (key, val) in fields {
                wtr.write_record([key, val])?;
            }
            Ok(())
        }
    }
}

/// The list worth exporting: the detailed rows first, then anything else.
fn preferred_list(result: &Value) -> Option<(&str, &[Value])> {
    let lists = object_arrays(result);
    let rows = lists.iter().find(|(name, _)| *name == "rows").copied();
    rows.or_else(|| lists.first().copied())
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([format_csv_value(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, result_of(value)).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_rows_exported_before_schedule() {
        let v = json!({
            "result": {
                "monthly_quota": "100",
                "rows": [{ "month": 1, "interest": "0" }],
                "schedule": [{ "month": 0, "balance": "1200" }, { "month": 1, "balance": "1100" }]
            }
        });
        let out = render(&v);
        let header = out.lines().next().unwrap();
        assert!(header.contains("interest") && header.contains("month"), "got {out}");
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_scalar_result_as_field_value() {
        let v = json!({ "result": { "tae": "6.157", "breakdown": { "expenses": "0" } } });
        let out = render(&v);
        assert!(out.contains("field,value"));
        assert!(out.contains("breakdown.expenses,0"));
    }
}
