/// Comparator - Structural Equality of Decoded Values
///
/// **Equality Rules:**
/// - Integers: exact comparison at any magnitude (numbers keep their source text)
/// - Integer vs float: compared as f64 (`5 == 5.0`)
/// - Booleans never equal numbers (`true != 1`)
/// - `null` equals only `null`
/// - Arrays: same length, element-wise, order matters
/// - Objects: same key set, values equal, key order ignored
/// - Strings: exact, case-sensitive, no trimming

use serde_json::{Number, Value};

pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    let (a_text, b_text) = (a.to_string(), b.to_string());
    if is_integer(&a_text) && is_integer(&b_text) {
        return canonical_integer(&a_text) == canonical_integer(&b_text);
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn is_integer(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}

/// JSON forbids leading zeros, so only `-0` has a second spelling
fn canonical_integer(text: &str) -> &str {
    if text == "-0" {
        "0"
    } else {
        text
    }
}
