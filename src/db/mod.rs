//! Index storage shared by ingestion and the serving path.
//!
//! The vector index itself lives in the `docqa-vector` crate; this module
//! owns the process-wide handle that readers snapshot and ingestion swaps.

pub mod index_store;

pub use index_store::{chunk_entry, hit_chunk, IndexHandle};
