use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, is_record_array};

/// Sub-tables longer than this are summarised rather than printed.
const MAX_INLINE_ROWS: usize = 40;

pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_envelope(result, map),
            _ => print_object(map),
        },
        Value::Array(arr) => print_records(arr),
        _ => println!("{}", format_cell(value)),
    }
}

/// Scalars as a Field/Value table, then each record array as its own table.
fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested = Vec::new();
    for (key, val) in map {
        if is_record_array(val) {
            nested.push((key, val));
        } else {
            builder.push_record([key.as_str(), &format_cell(val)]);
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        if let Value::Array(arr) = val {
            println!("\n{}:", key);
            if arr.len() > MAX_INLINE_ROWS {
                println!("  ({} rows; use --output csv for the full series)", arr.len());
            } else {
                print_records(arr);
            }
        }
    }
}

fn print_envelope(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    print_object(result);

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

fn print_records(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        if arr.is_empty() {
            println!("(empty)");
        }
        for item in arr {
            println!("{}", format_cell(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
