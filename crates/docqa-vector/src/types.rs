//! Common types for docqa-vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for an entry in the index.
pub type VectorId = String;

/// Metadata associated with an entry.
///
/// Ordered key-value pairs so the document store serializes identically on
/// every persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Key-value pairs of metadata.
    pub data: BTreeMap<String, MetadataValue>,
}

impl VectorMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata from a list of key-value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a string value by key.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key)? {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integer value by key.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if metadata is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of metadata entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<usize> for MetadataValue {
    fn from(i: usize) -> Self {
        MetadataValue::Int(i as i64)
    }
}

/// The text and metadata an entry carries alongside its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Source text of the chunk.
    pub text: String,
    /// Arbitrary metadata (source URL, offsets, ...).
    pub metadata: VectorMetadata,
}

/// One entry handed to [`crate::VectorIndex::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Unique id of the entry.
    pub id: VectorId,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Text and metadata paired with the vector.
    pub document: StoredDocument,
}

impl IndexEntry {
    /// Create a new entry.
    pub fn new(id: impl Into<VectorId>, vector: Vec<f32>, document: StoredDocument) -> Self {
        Self {
            id: id.into(),
            vector,
            document,
        }
    }
}

/// Result of a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// ID of the matched entry.
    pub id: VectorId,
    /// Cosine similarity with the query.
    pub score: f32,
    /// Text and metadata of the matched entry.
    pub document: StoredDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_basic() {
        let meta = VectorMetadata::from_pairs([
            ("source", MetadataValue::from("https://docs.example.com/a")),
            ("chunk_index", MetadataValue::from(3usize)),
        ]);

        assert_eq!(meta.get_string("source"), Some("https://docs.example.com/a"));
        assert_eq!(meta.get_int("chunk_index"), Some(3));
        assert_eq!(meta.get_string("chunk_index"), None);
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_metadata_from_pairs() {
        let meta = VectorMetadata::from_pairs([
            ("key1", MetadataValue::String("value1".to_string())),
            ("key2", MetadataValue::Int(123)),
        ]);

        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get_string("key1"), Some("value1"));
        assert_eq!(meta.get_int("key2"), Some(123));
    }

    #[test]
    fn test_metadata_json_is_key_ordered() {
        let a = VectorMetadata::from_pairs([("b", 1i64), ("a", 2i64)]);
        let b = VectorMetadata::from_pairs([("a", 2i64), ("b", 1i64)]);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
