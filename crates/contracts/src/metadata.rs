//! MetadataDocument - per-frame structured metadata
//!
//! Opaque JSON document delivered alongside a frame. Only field lookup and
//! numeric decoding are defined here; the transport encoding is not.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ContractError;

/// Structured metadata attached to a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataDocument(Value);

impl MetadataDocument {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a document from JSON text
    pub fn from_json_str(s: &str) -> Result<Self, ContractError> {
        serde_json::from_str(s)
            .map(Self)
            .map_err(|e| ContractError::metadata_decode(format!("invalid metadata json: {e}")))
    }

    /// Walk nested object keys.
    ///
    /// Returns `None` if any segment is missing or an intermediate value is not an object.
    pub fn nested<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.0, |value, key| value.as_object()?.get(key.as_ref()))
    }

    /// Decode a field value as `f32`.
    ///
    /// Only JSON numbers are accepted. Numbers that do not fit in `f32` are rejected.
    pub fn decode_f32(value: &Value) -> Result<f32, ContractError> {
        let wide = value
            .as_f64()
            .ok_or_else(|| ContractError::metadata_decode(format!("expected number, got {}", kind(value))))?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(ContractError::metadata_decode(format!(
                "number {wide} out of f32 range"
            )));
        }
        Ok(narrow)
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the underlying JSON value
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for MetadataDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered list of field names addressing a nested metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataPath(Vec<String>);

impl MetadataPath {
    /// Build a path from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// `header` -> `depth-units`
    pub fn depth_units() -> Self {
        Self::new(["header", "depth-units"])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MetadataPath {
    fn default() -> Self {
        Self::depth_units()
    }
}

impl fmt::Display for MetadataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_lookup() {
        let doc = MetadataDocument::new(json!({"header": {"depth-units": 0.0001, "frame": 7}}));
        let path = MetadataPath::depth_units();
        assert_eq!(doc.nested(path.segments()), Some(&json!(0.0001)));
        assert_eq!(doc.nested(&["header", "frame"]), Some(&json!(7)));
    }

    #[test]
    fn test_nested_missing_segment() {
        let doc = MetadataDocument::new(json!({"header": {"timestamp": 1}}));
        assert!(doc.nested(&["header", "depth-units"]).is_none());
        assert!(doc.nested(&["metadata", "depth-units"]).is_none());
    }

    #[test]
    fn test_nested_through_non_object() {
        let doc = MetadataDocument::new(json!({"header": [1, 2, 3]}));
        assert!(doc.nested(&["header", "depth-units"]).is_none());
        assert!(MetadataDocument::default().nested(&["header"]).is_none());
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(MetadataDocument::decode_f32(&json!(0.00025)).unwrap(), 0.00025);
        assert_eq!(MetadataDocument::decode_f32(&json!(1)).unwrap(), 1.0);
    }

    #[test]
    fn test_decode_rejects_non_numbers() {
        for value in [json!("0.001"), json!(true), json!(null), json!([0.001]), json!({"v": 1})] {
            let err = MetadataDocument::decode_f32(&value).unwrap_err();
            assert!(matches!(err, ContractError::MetadataDecode { .. }), "{value}");
        }
    }

    #[test]
    fn test_decode_rejects_f32_overflow() {
        assert!(MetadataDocument::decode_f32(&json!(1e300)).is_err());
    }

    #[test]
    fn test_path_display() {
        assert_eq!(MetadataPath::depth_units().to_string(), "header.depth-units");
    }
}
