use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_scalars, format_value, object_arrays, result_of};

/// Format output as tables: one Field/Value table for the scalar results,
/// then one table per list (expense lines, amortisation rows, schedule).
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(_) => {
            let mut fields = Vec::new();
            flatten_scalars("", result, &mut fields);
            if !fields.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in fields {
                    builder.push_record([key, val]);
                }
                println!("{}", Table::from(builder));
            }

            for (name, rows) in object_arrays(result) {
                println!("\n{}:", name);
                print_array_table(rows);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", format_value(result)),
    }

    print_envelope_notes(value);
}

fn print_envelope_notes(value: &Value) {
    let Value::Object(envelope) = value else {
        return;
    };

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}
