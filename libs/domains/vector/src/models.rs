use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// Dimensionality of indexes created when none is configured
pub const DEFAULT_DIMENSION: u64 = 4;

/// Number of matches returned by a query when none is configured
pub const DEFAULT_TOP_K: u64 = 10;

/// Metadata key reserved for the textual record id on providers with numeric ids
pub const RESERVED_ID_KEY: &str = "_id";

/// Scalar metadata value (or a small list of text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        MetadataValue::TextList(value)
    }
}

/// Record metadata, keyed by short text keys
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Query filter: a scalar value means equality, a list means "any of"
pub type QueryFilter = BTreeMap<String, MetadataValue>;

/// Similarity metric of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
        }
    }
}

/// Construction-time parameters shared by every adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Dimensionality of indexes created by this searcher
    pub dimension: u64,
    /// Maximum number of matches returned per query
    pub top_k: u64,
    pub metric: DistanceMetric,
}

impl SearchSettings {
    pub fn new(dimension: u64, top_k: u64) -> Self {
        Self {
            dimension,
            top_k,
            metric: DistanceMetric::Cosine,
        }
    }

    pub fn validate(&self) -> VectorResult<()> {
        if self.dimension == 0 {
            return Err(VectorError::InvalidConfig(
                "dimension must be positive".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(VectorError::InvalidConfig(
                "top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION, DEFAULT_TOP_K)
    }
}

/// An ingestion record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertVector {
    pub id: String,
    pub vectors: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl UpsertVector {
    pub fn new(id: impl Into<String>, vectors: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vectors,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> VectorResult<()> {
        validate_record_id(&self.id)?;
        validate_vector(&self.vectors)?;

        if self.metadata.contains_key(RESERVED_ID_KEY) {
            return Err(VectorError::InvalidInput(format!(
                "metadata key '{}' is reserved",
                RESERVED_ID_KEY
            )));
        }

        for (key, value) in &self.metadata {
            if key.is_empty() {
                return Err(VectorError::InvalidInput(
                    "metadata keys must not be empty".to_string(),
                ));
            }
            if let MetadataValue::Float(f) = value
                && !f.is_finite()
            {
                return Err(VectorError::InvalidInput(format!(
                    "metadata value for '{}' is not finite",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// A retrieval record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f32,
    pub vectors: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

pub(crate) fn validate_index_name(index: &str) -> VectorResult<()> {
    if index.is_empty() {
        return Err(VectorError::InvalidInput(
            "index name must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_record_id(id: &str) -> VectorResult<()> {
    if id.is_empty() {
        return Err(VectorError::InvalidInput(
            "record id must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_vector(values: &[f32]) -> VectorResult<()> {
    if values.is_empty() {
        return Err(VectorError::InvalidInput(
            "vector must not be empty".to_string(),
        ));
    }
    if let Some(position) = values.iter().position(|v| !v.is_finite()) {
        return Err(VectorError::InvalidInput(format!(
            "vector element {} is not finite",
            position
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_upsert_vector_validation() {
        let valid = UpsertVector::new("abc", vec![0.1, 0.2, 0.3, 0.4]).with_metadata("k", "v");
        assert!(valid.validate().is_ok());

        let empty_id = UpsertVector::new("", vec![0.1]);
        assert_eq!(empty_id.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

        let empty_vector = UpsertVector::new("abc", vec![]);
        assert_eq!(empty_vector.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_non_finite_vectors_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let record = UpsertVector::new("abc", vec![0.1, bad, 0.3]);
            let err = record.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert!(err.to_string().contains("element 1"));
        }
    }

    #[test]
    fn test_reserved_metadata_key_rejected() {
        let record = UpsertVector::new("abc", vec![0.1]).with_metadata(RESERVED_ID_KEY, "other");
        assert_eq!(record.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_metadata_value_json_shapes() {
        let json = serde_json::json!({
            "flag": true,
            "count": 3,
            "ratio": 0.5,
            "name": "soup",
            "tags": ["quick", "vegan"]
        });

        let metadata: Metadata = serde_json::from_value(json).unwrap();

        assert_eq!(metadata["flag"], MetadataValue::Bool(true));
        assert_eq!(metadata["count"], MetadataValue::Integer(3));
        assert_eq!(metadata["ratio"], MetadataValue::Float(0.5));
        assert_eq!(metadata["name"], MetadataValue::Text("soup".to_string()));
        assert_eq!(
            metadata["tags"],
            MetadataValue::TextList(vec!["quick".to_string(), "vegan".to_string()])
        );
    }

    #[test]
    fn test_search_settings_defaults() {
        let settings = SearchSettings::default();
        assert_eq!(settings.dimension, DEFAULT_DIMENSION);
        assert_eq!(settings.top_k, DEFAULT_TOP_K);
        assert_eq!(settings.metric, DistanceMetric::Cosine);
        assert!(settings.validate().is_ok());

        assert!(SearchSettings::new(0, 10).validate().is_err());
        assert!(SearchSettings::new(4, 0).validate().is_err());
    }
}
