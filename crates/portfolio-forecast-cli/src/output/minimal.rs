use serde_json::Value;

/// Key fields in order of priority.
const PRIORITY_KEYS: [&str; 6] = [
    "projected_value",
    "growth_factor",
    "realistic",
    "median",
    "holdings",
    "variance",
];

/// Fields that identify a row of an array result.
const LABEL_KEYS: [&str; 5] = ["tier", "plan", "years", "scenario", "asset"];

/// Print just the key answer value from the output.
///
/// Objects print their first non-null priority field, falling back to the
/// first field. Arrays print one labelled line per row.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Array(rows) => {
            for row in rows {
                println!("{}", format_row(row));
            }
        }
        Value::Object(map) => {
            for key in &PRIORITY_KEYS {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
                return;
            }
        }
        _ => println!("{}", format_minimal(result_obj)),
    }
}

fn format_row(row: &Value) -> String {
    let Value::Object(map) = row else {
        return format_minimal(row);
    };
    let label: Vec<String> = LABEL_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .map(format_minimal)
        .collect();
    let answer = PRIORITY_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
        .map(format_minimal)
        .unwrap_or_default();
    format!("{}: {}", label.join(" "), answer)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
