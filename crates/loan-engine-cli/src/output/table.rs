use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
///
/// Loan output nests arrays (schedule entries, upcoming payments, by-type
/// breakdowns) inside the result object; scalars render as a field/value
/// table and each nested array gets its own table underneath.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_nested_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    print_nested_object(result);

    // Print warnings if any
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

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars first as a field/value table, then one table per nested array.
fn print_nested_object(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", value);
        return;
    };

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut has_scalars = false;
    for (key, val) in map {
        if !matches!(val, Value::Array(_)) {
            builder.push_record([key.as_str(), &format_value(val)]);
            has_scalars = true;
        }
    }
    if has_scalars {
        println!("{}", Table::from(builder));
    }

    for (key, val) in map {
        if let Value::Array(arr) = val {
            if arr.is_empty() {
                continue;
            }
            println!("\n{}:", key);
            print_array_table(arr);
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(format_value)
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        // Simple array of values
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
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
