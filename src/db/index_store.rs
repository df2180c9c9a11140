//! Process-wide index handle
//!
//! The serving path reads the current [`VectorIndex`] through an
//! [`IndexHandle`]. Re-ingestion builds a complete replacement off to the side
//! and publishes it with a single atomic pointer swap, so in-flight requests
//! keep the snapshot they started with and no reader ever sees a partial index.

use crate::types::{AppError, Chunk, Embedding, Result};
use arc_swap::ArcSwapOption;
use docqa_vector::{
    IndexEntry, MetadataValue, SearchResult, StoredDocument, VectorIndex, VectorMetadata,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

const META_SOURCE: &str = "source";
const META_INDEX: &str = "chunk_index";
const META_START: &str = "start";
const META_END: &str = "end";

/// Shared, swappable slot for the loaded index
#[derive(Clone, Default)]
pub struct IndexHandle {
    current: Arc<ArcSwapOption<VectorIndex>>,
}

impl IndexHandle {
    /// A handle with nothing loaded yet
    pub fn empty() -> Self {
        Self::default()
    }

    /// A handle already holding `index`
    pub fn with_index(index: VectorIndex) -> Self {
        let handle = Self::empty();
        handle.publish(index);
        handle
    }

    /// Snapshot of the current index
    pub fn current(&self) -> Result<Arc<VectorIndex>> {
        self.current.load_full().ok_or(AppError::IndexNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of entries in the current index, 0 when nothing is loaded
    pub fn len(&self) -> usize {
        self.current.load_full().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically replace the current index
    pub fn publish(&self, index: VectorIndex) {
        let entries = index.len();
        self.current.store(Some(Arc::new(index)));
        info!(entries, "Published index");
    }

    /// Load the persisted index from `dir` and publish it
    ///
    /// On any failure the previously published index stays in place.
    #[instrument(skip(self))]
    pub async fn load_from(&self, dir: &Path, dimensions: usize) -> Result<usize> {
        let index = docqa_vector::load_index(dir, Some(dimensions)).await?;
        let entries = index.len();
        self.publish(index);
        Ok(entries)
    }
}

/// Pair a chunk with its embedding as an index entry
pub fn chunk_entry(chunk: &Chunk, vector: Embedding) -> IndexEntry {
    let metadata = VectorMetadata::from_pairs([
        (META_SOURCE, MetadataValue::from(chunk.source.as_str())),
        (META_INDEX, chunk.index.into()),
        (META_START, chunk.start.into()),
        (META_END, chunk.end.into()),
    ]);

    IndexEntry::new(
        chunk.id(),
        vector,
        StoredDocument {
            text: chunk.text.clone(),
            metadata,
        },
    )
}

/// Recover the chunk a search hit was built from
pub fn hit_chunk(hit: &SearchResult) -> Chunk {
    let meta = &hit.document.metadata;
    let int = |key: &str| meta.get_int(key).unwrap_or(0).max(0) as usize;

    Chunk {
        source: meta.get_string(META_SOURCE).unwrap_or_default().to_string(),
        index: int(META_INDEX),
        start: int(META_START),
        end: int(META_END),
        text: hit.document.text.clone(),
    }
}
