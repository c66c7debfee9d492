//! Metadata field extractor
//!
//! Reads the per-frame depth units from a metadata document. A missing field and an
//! undecodable field both mean "not present": the caller falls back to the resolver.

use contracts::{ContractError, MetadataDocument, MetadataPath};
use thiserror::Error;
use tracing::trace;

/// Why a field could not be read
#[derive(Debug, Error)]
pub enum FieldError {
    /// Some path segment is missing
    #[error("field '{path}' not present")]
    Absent { path: String },

    /// Field exists but is not a number
    #[error("field '{path}' not decodable: {source}")]
    Undecodable {
        path: String,
        #[source]
        source: ContractError,
    },
}

/// Extracts a nested numeric field from metadata documents
#[derive(Debug, Clone, Default)]
pub struct MetadataFieldExtractor {
    path: MetadataPath,
}

impl MetadataFieldExtractor {
    /// Extractor for `header.depth-units`
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor for an arbitrary nested field
    pub fn with_path(path: MetadataPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &MetadataPath {
        &self.path
    }

    /// Decoded field value, or `None` if absent or undecodable.
    ///
    /// The value is returned as-is; range checks are up to the caller.
    #[inline]
    pub fn extract(&self, doc: &MetadataDocument) -> Option<f32> {
        self.lookup(doc).ok()
    }

    /// Like [`extract`](Self::extract) but keeps the reason a value is missing
    pub fn lookup(&self, doc: &MetadataDocument) -> Result<f32, FieldError> {
        let raw = doc
            .nested(self.path.segments())
            .ok_or_else(|| FieldError::Absent {
                path: self.path.to_string(),
            })?;

        MetadataDocument::decode_f32(raw)
            .inspect(|value| trace!(path = %self.path, value, "metadata field decoded"))
            .map_err(|source| FieldError::Undecodable {
                path: self.path.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> MetadataDocument {
        MetadataDocument::new(value)
    }

    #[test]
    fn test_extract_present_value() {
        let extractor = MetadataFieldExtractor::new();
        let md = doc(json!({"header": {"depth-units": 0.0001, "timestamp": 12}}));
        assert_eq!(extractor.extract(&md), Some(0.0001));
    }

    #[test]
    fn test_extract_absent() {
        let extractor = MetadataFieldExtractor::new();
        assert_eq!(extractor.extract(&doc(json!({}))), None);
        assert_eq!(extractor.extract(&doc(json!({"header": {}}))), None);
        assert!(matches!(
            extractor.lookup(&doc(json!({"depth-units": 0.001}))),
            Err(FieldError::Absent { .. })
        ));
    }

    #[test]
    fn test_extract_undecodable_collapses_to_none() {
        let extractor = MetadataFieldExtractor::new();
        for value in [json!("0.001"), json!({"value": 0.001}), json!(null), json!(false)] {
            let md = doc(json!({"header": {"depth-units": value}}));
            assert_eq!(extractor.extract(&md), None);
            assert!(matches!(extractor.lookup(&md), Err(FieldError::Undecodable { .. })));
        }
    }

    #[test]
    fn test_extract_returns_value_unvalidated() {
        let extractor = MetadataFieldExtractor::new();
        let md = doc(json!({"header": {"depth-units": -2.0}}));
        assert_eq!(extractor.extract(&md), Some(-2.0));
    }

    #[test]
    fn test_custom_path() {
        let extractor = MetadataFieldExtractor::with_path(MetadataPath::new(["intrinsics", "scale"]));
        let md = doc(json!({"intrinsics": {"scale": 0.000125}}));
        assert_eq!(extractor.extract(&md), Some(0.000125));
        assert_eq!(extractor.path().to_string(), "intrinsics.scale");
    }
}
