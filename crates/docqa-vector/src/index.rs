//! Exact cosine-similarity index.
//!
//! Entries keep their insertion order, which doubles as the tie-breaker for
//! equal scores. The index is immutable after [`VectorIndex::build`]; share it
//! behind an `Arc` for concurrent readers.

use crate::distance::{cosine_with_norms, l2_norm};
use crate::error::{Error, Result};
use crate::types::{IndexEntry, SearchResult};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// An in-memory, read-only set of embeddings with their documents.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from entries, preserving their order.
    ///
    /// Every vector must have exactly `dimensions` finite components and
    /// every id must be unique. An empty entry list yields an empty index.
    pub fn build<I>(dimensions: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = IndexEntry>,
    {
        if dimensions == 0 {
            return Err(Error::InvalidVector(
                "index dimensions must be greater than zero".to_string(),
            ));
        }

        let entries: Vec<IndexEntry> = entries.into_iter().collect();
        let mut seen = HashSet::with_capacity(entries.len());
        let mut norms = Vec::with_capacity(entries.len());

        for entry in &entries {
            validate_vector(&entry.vector, dimensions)?;
            if !seen.insert(entry.id.as_str()) {
                return Err(Error::DuplicateId(entry.id.clone()));
            }
            norms.push(l2_norm(&entry.vector));
        }

        debug!(dimensions, count = entries.len(), "Built vector index");

        Ok(Self {
            dimensions,
            entries,
            norms,
        })
    }

    /// Return the `k` entries most similar to `query`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores keep
    /// insertion order. When `k` exceeds the entry count every entry is
    /// returned.
    #[instrument(skip(self, query), fields(entries = self.entries.len()))]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        validate_vector(query, self.dimensions)?;

        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (entry, norm))| {
                (i, cosine_with_norms(query, query_norm, &entry.vector, *norm))
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let results: Vec<SearchResult> = scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                SearchResult {
                    id: entry.id.clone(),
                    score,
                    document: entry.document.clone(),
                }
            })
            .collect();

        debug!(k, returned = results.len(), "Search complete");
        Ok(results)
    }

    /// Vector dimensions of every entry.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

fn validate_vector(vector: &[f32], dimensions: usize) -> Result<()> {
    if vector.len() != dimensions {
        return Err(Error::DimensionMismatch {
            expected: dimensions,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite components".to_string(),
        ));
    }
    Ok(())
}
