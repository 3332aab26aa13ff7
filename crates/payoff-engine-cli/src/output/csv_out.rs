use serde_json::Value;
use std::io;

use super::{format_cell, is_record_array};

/// Write output as CSV to stdout.
///
/// Series (curves, scenario rows) become one row per point. For an analysis
/// envelope the scenario table is written, since that is what gets pasted
/// into spreadsheets.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Array(arr) => write_records(&mut wtr, arr),
        Value::Object(map) => {
            let body = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            match body.get("scenarios") {
                Some(rows) if is_record_array(rows) => {
                    if let Value::Array(rows) = rows {
                        write_records(&mut wtr, rows);
                    }
                }
                _ => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in body {
                        let _ = wtr.write_record([key.as_str(), &format_cell(val)]);
                    }
                }
            }
        }
        _ => {
            let _ = wtr.write_record([&format_cell(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_records(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_cell(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
