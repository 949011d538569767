//! JSON decoding for fixtures and worker replies.
//!
//! serde_json stops at 128 nested levels; fixtures and candidate results may
//! nest as deep as the interpreter allows, so the limit is replaced by
//! [`MAX_DEPTH`] and parsing runs on a growable stack.

use serde::de::{DeserializeOwned, Error as _};

/// Deepest array/object nesting accepted, the interpreter's default recursion limit
pub const MAX_DEPTH: usize = 1000;

pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let depth = nesting_depth(text);
    if depth > MAX_DEPTH {
        return Err(serde_json::Error::custom(format!(
            "nesting depth {} exceeds {}",
            depth, MAX_DEPTH
        )));
    }

    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// Maximum bracket depth outside string literals
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn nested(levels: usize) -> String {
        format!("{}0{}", "[".repeat(levels), "]".repeat(levels))
    }

    #[test]
    fn test_accepts_nesting_beyond_serde_default() {
        let value: Value = from_str(&nested(130)).unwrap();
        let mut inner = &value;
        for _ in 0..130 {
            inner = &inner[0];
        }
        assert_eq!(inner, &json!(0));
    }

    #[test]
    fn test_rejects_nesting_past_max_depth() {
        assert!(from_str::<Value>(&nested(MAX_DEPTH)).is_ok());
        let err = from_str::<Value>(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(err.to_string().contains("nesting depth"));
    }

    #[test]
    fn test_brackets_inside_strings_are_not_nesting() {
        assert_eq!(nesting_depth(r#"["[[[", {"k": "\"]]{"}]"#), 2);
        let value: Value = from_str(r#"["[[[", "\\"]"#).unwrap();
        assert_eq!(value, json!(["[[[", "\\"]));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(from_str::<Value>("[1] x").is_err());
        assert!(from_str::<Value>("not json").is_err());
    }
}
