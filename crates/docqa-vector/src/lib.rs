//! # docqa-vector
//!
//! A pure-Rust embedded vector index with exact cosine-similarity search and
//! two-file persistence.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docqa_vector::{IndexEntry, StoredDocument, VectorIndex, VectorMetadata};
//!
//! let index = VectorIndex::build(3, vec![IndexEntry::new(
//!     "chunk-0",
//!     vec![0.1, 0.2, 0.3],
//!     StoredDocument { text: "hello".into(), metadata: VectorMetadata::new() },
//! )])?;
//!
//! let hits = index.search(&[0.1, 0.2, 0.3], 3)?;
//! docqa_vector::save_index(&index, "data/index".as_ref()).await?;
//! let restored = docqa_vector::load_index("data/index".as_ref(), Some(3)).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 VectorIndex                   │
//! │  ┌─────────────┐  ┌────────┐  ┌────────────┐  │
//! │  │   entries   │  │ norms  │  │ dimensions │  │
//! │  │ (ordered)   │  │ (L2)   │  │  (fixed)   │  │
//! │  └─────────────┘  └────────┘  └────────────┘  │
//! └───────────────────────────────────────────────┘
//!            │ save_index / load_index
//!            ▼
//!   <dir>/vectors.bin      <dir>/docstore.json
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use distance::cosine_similarity;
pub use error::{Error, Result};
pub use index::VectorIndex;
pub use persistence::{index_exists, load_index, save_index, DOCSTORE_FILE, VECTORS_FILE};
pub use types::{
    IndexEntry, MetadataValue, SearchResult, StoredDocument, VectorId, VectorMetadata,
};
