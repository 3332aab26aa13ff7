use serde_json::Value;

use super::format_cell;

/// Print just the headline answer.
///
/// Break-even statements win over numeric fields, so `--output minimal` on
/// an analysis prints the sentence a report would show.
pub fn print_minimal(value: &Value) {
    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "break_even_summary",
        "summary",
        "total_pct",
        "redemption_pct",
        "level",
    ];

    match body {
        Value::Object(map) => {
            for key in &priority_keys {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_cell(val));
                        return;
                    }
                }
            }
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_cell(val));
            }
        }
        Value::Array(arr) => println!("{} rows", arr.len()),
        _ => println!("{}", format_cell(body)),
    }
}
