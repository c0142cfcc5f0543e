use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Array results become one record per row. Object results holding arrays
/// of rows (asset and plan statistics) write each array as a record set
/// tagged with a leading `section` column; other objects are written as
/// field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(arr) => write_rows(&mut wtr, arr),
        Value::Object(map) => write_object(&mut wtr, map),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_object(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let row_sets: Vec<(&String, &Vec<Value>)> = map
        .iter()
        .filter_map(|(k, v)| match v {
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => Some((k, arr)),
            _ => None,
        })
        .collect();

    if !row_sets.is_empty() {
        for (section, rows) in row_sets {
            write_section(wtr, section, rows);
        }
        return;
    }

    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_section(wtr: &mut StdoutWriter<'_>, section: &str, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let mut header = vec!["section"];
    header.extend(headers.iter().copied());
    let _ = wtr.write_record(&header);
    for item in rows {
        if let Value::Object(map) = item {
            let mut row = vec![section.to_string()];
            row.extend(
                headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default()),
            );
            let _ = wtr.write_record(&row);
        }
    }
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
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
