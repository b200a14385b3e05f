use serde_json::Value;

/// Value at a dot-separated path. Numeric segments index into lists; a
/// missing segment yields `Value::Null`.
pub fn extract_path(record: &Value, path: &str) -> Value {
    lookup(record, path).cloned().unwrap_or(Value::Null)
}

/// Borrowing variant of [`extract_path`]
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(record);
    }

    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Number, or a string holding a number
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Rounded integer view of a value
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => value_as_f64(value).map(|f| f.round() as i64),
    }
}

/// Empty means null or a blank string
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Identifier view of a scalar (`12` and `"12"` both give `"12"`)
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| format!("{}", f.round() as i64)),
        },
        _ => None,
    }
}
