use serde_json::Value;

/// Structural JSON equality: object key order is irrelevant, while primitive
/// values, array order and nesting must match exactly.
pub fn structural_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len() && l.iter().all(|(key, value)| r.get(key).is_some_and(|other| structural_eq(value, other)))
        }
        (Value::Array(l), Value::Array(r)) => l.len() == r.len() && l.iter().zip(r).all(|(a, b)| structural_eq(a, b)),
        (l, r) => l == r,
    }
}
