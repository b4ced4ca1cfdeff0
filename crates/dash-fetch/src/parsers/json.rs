//! JSON artifact parsing
//!
//! Uses `serde_json` for `finished.json` objects and `_ansible.log.json`
//! arrays.

use crate::error::ParseError;
use serde_json::{Map, Value};

/// A parsed JSON object
pub type JsonObject = Map<String, Value>;

/// A parsed JSON array
pub type JsonArray = Vec<Value>;

/// Parse bytes as a JSON object
///
/// # Errors
/// Returns error if the content is not JSON or not an object
pub fn parse_object(content: &[u8]) -> Result<JsonObject, ParseError> {
    match serde_json::from_slice(content)? {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::UnexpectedShape {
            expected: "object",
            actual: shape(&other),
        }),
    }
}

/// Parse bytes as a JSON array
///
/// # Errors
/// Returns error if the content is not JSON or not an array
pub fn parse_array(content: &[u8]) -> Result<JsonArray, ParseError> {
    match serde_json::from_slice(content)? {
        Value::Array(items) => Ok(items),
        other => Err(ParseError::UnexpectedShape {
            expected: "array",
            actual: shape(&other),
        }),
    }
}

/// Follow a dotted path through nested objects
///
/// # Examples
/// `get_path(&value, "stats.localhost.ok")`
#[must_use]
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

const fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_valid() {
        let obj = parse_object(br#"{"passed": true, "result": "SUCCESS"}"#).unwrap();
        assert_eq!(obj["passed"], true);
        assert_eq!(obj["result"], "SUCCESS");
    }

    #[test]
    fn object_rejects_array_and_garbage() {
        assert!(matches!(
            parse_object(b"[1, 2]"),
            Err(ParseError::UnexpectedShape { expected: "object", actual: "array" })
        ));
        assert!(matches!(parse_object(b"<!doctype html>"), Err(ParseError::Json(_))));
        assert!(parse_object(b"").is_err());
    }

    #[test]
    fn array_valid_and_invalid() {
        assert_eq!(parse_array(b"[1, {\"a\": 2}]").unwrap().len(), 2);
        assert!(matches!(
            parse_array(b"{}"),
            Err(ParseError::UnexpectedShape { expected: "array", actual: "object" })
        ));
    }

    #[test]
    fn get_path_walks_objects() {
        let value = json!({"stats": {"localhost": {"ok": 3}}, "flag": true});
        assert_eq!(get_path(&value, "stats.localhost.ok"), Some(&json!(3)));
        assert_eq!(get_path(&value, "flag"), Some(&json!(true)));
        assert_eq!(get_path(&value, "stats.missing"), None);
        assert_eq!(get_path(&value, "flag.deeper"), None);
    }
}
