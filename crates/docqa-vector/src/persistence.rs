//! Persistence layer for docqa-vector.
//!
//! An index directory holds two artifacts:
//! - `vectors.bin` - ids and a flat `f32` matrix (postcard format)
//! - `docstore.json` - per-entry text and metadata, in the same order
//!
//! Both files must be present and agree on ids, order, and dimensions for a
//! load to succeed. Saves are staged in a sibling directory and renamed over
//! the target, so readers never observe a half-written index.
//!
//! The swap takes two renames: the current directory moves aside to
//! `.<name>.old-*`, then the staged one moves in. A load that finds nothing at
//! the target falls back to such a leftover generation, which covers both a
//! load racing the swap and a save that crashed between the renames.

use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::types::{IndexEntry, StoredDocument, VectorId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// File name of the binary vector artifact.
pub const VECTORS_FILE: &str = "vectors.bin";
/// File name of the document store artifact.
pub const DOCSTORE_FILE: &str = "docstore.json";

const MAGIC: [u8; 4] = *b"DQVX";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VectorFile {
    magic: [u8; 4],
    version: u16,
    dimensions: u64,
    ids: Vec<VectorId>,
    /// Row-major, `ids.len() * dimensions` values.
    data: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocStore {
    version: u16,
    dimensions: usize,
    entries: Vec<DocStoreEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocStoreEntry {
    id: VectorId,
    #[serde(flatten)]
    document: StoredDocument,
}

/// Whether any index artifact exists in `dir`.
pub async fn index_exists(dir: &Path) -> bool {
    file_exists(&dir.join(VECTORS_FILE)).await || file_exists(&dir.join(DOCSTORE_FILE)).await
}

/// Save an index to `dir`, replacing any index already there.
#[instrument(skip(index), fields(entries = index.len()))]
pub async fn save_index(index: &VectorIndex, dir: &Path) -> Result<()> {
    let (vectors, docstore) = encode(index)?;

    let parent = parent_of(dir);
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Persistence(format!("invalid index path '{}'", dir.display())))?;
    tokio::fs::create_dir_all(&parent).await?;

    let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&staging).await?;

    let written = async {
        write_synced(&staging.join(VECTORS_FILE), &vectors).await?;
        write_synced(&staging.join(DOCSTORE_FILE), &docstore).await
    }
    .await;
    if let Err(e) = written {
        remove_dir_quietly(&staging).await;
        return Err(e);
    }

    swap_into_place(&staging, dir, &parent, &name).await?;

    info!(path = ?dir, "Saved vector index");
    Ok(())
}

/// Load an index from `dir`.
///
/// When `expected_dimensions` is given, a stored index of any other
/// dimension is rejected with [`Error::DimensionMismatch`].
#[instrument]
pub async fn load_index(dir: &Path, expected_dimensions: Option<usize>) -> Result<VectorIndex> {
    match load_dir(dir, expected_dimensions).await {
        Err(Error::NotFound(_)) => {}
        other => return other,
    }

    for previous in previous_generations(dir).await {
        warn!(path = ?previous, "Index directory missing; loading a generation left by a save");
        if let Ok(index) = load_dir(&previous, expected_dimensions).await {
            return Ok(index);
        }
    }
    // The swap may have completed while the old generation was being read
    load_dir(dir, expected_dimensions).await
}

async fn load_dir(dir: &Path, expected_dimensions: Option<usize>) -> Result<VectorIndex> {
    let vectors_path = dir.join(VECTORS_FILE);
    let docstore_path = dir.join(DOCSTORE_FILE);

    match (
        file_exists(&vectors_path).await,
        file_exists(&docstore_path).await,
    ) {
        (false, false) => return Err(Error::NotFound(dir.to_path_buf())),
        (true, false) => return Err(Error::Corrupt(format!("{} is missing", DOCSTORE_FILE))),
        (false, true) => return Err(Error::Corrupt(format!("{} is missing", VECTORS_FILE))),
        (true, true) => {}
    }

    let vector_bytes = tokio::fs::read(&vectors_path).await?;
    let vectors: VectorFile = postcard::from_bytes(&vector_bytes)
        .map_err(|e| Error::Corrupt(format!("failed to parse {}: {}", VECTORS_FILE, e)))?;

    let docstore_json = tokio::fs::read_to_string(&docstore_path).await?;
    let docstore: DocStore = serde_json::from_str(&docstore_json)
        .map_err(|e| Error::Corrupt(format!("failed to parse {}: {}", DOCSTORE_FILE, e)))?;

    let index = decode(vectors, docstore, expected_dimensions)?;
    info!(
        path = ?dir,
        entries = index.len(),
        dimensions = index.dimensions(),
        "Loaded vector index"
    );
    Ok(index)
}

fn encode(index: &VectorIndex) -> Result<(Vec<u8>, Vec<u8>)> {
    let entries = index.entries();
    let mut data = Vec::with_capacity(entries.len() * index.dimensions());
    for entry in entries {
        data.extend_from_slice(&entry.vector);
    }

    let vectors = VectorFile {
        magic: MAGIC,
        version: FORMAT_VERSION,
        dimensions: index.dimensions() as u64,
        ids: entries.iter().map(|e| e.id.clone()).collect(),
        data,
    };
    let vectors = postcard::to_allocvec(&vectors)
        .map_err(|e| Error::Persistence(format!("Failed to serialize vectors: {}", e)))?;

    let docstore = DocStore {
        version: FORMAT_VERSION,
        dimensions: index.dimensions(),
        entries: entries
            .iter()
            .map(|e| DocStoreEntry {
                id: e.id.clone(),
                document: e.document.clone(),
            })
            .collect(),
    };
    let docstore = serde_json::to_vec_pretty(&docstore)
        .map_err(|e| Error::Persistence(format!("Failed to serialize docstore: {}", e)))?;

    Ok((vectors, docstore))
}

fn decode(
    vectors: VectorFile,
    docstore: DocStore,
    expected_dimensions: Option<usize>,
) -> Result<VectorIndex> {
    if vectors.magic != MAGIC {
        return Err(Error::Corrupt("bad magic in vector file".to_string()));
    }
    if vectors.version != FORMAT_VERSION || docstore.version != FORMAT_VERSION {
        return Err(Error::Corrupt(format!(
            "unsupported format version (vectors {}, docstore {})",
            vectors.version, docstore.version
        )));
    }

    let dimensions = usize::try_from(vectors.dimensions)
        .map_err(|_| Error::Corrupt("stored dimensions overflow usize".to_string()))?;
    if dimensions != docstore.dimensions {
        return Err(Error::Corrupt(format!(
            "vector file has dimension {} but docstore has {}",
            dimensions, docstore.dimensions
        )));
    }
    if let Some(expected) = expected_dimensions {
        if expected != dimensions {
            return Err(Error::DimensionMismatch {
                expected,
                actual: dimensions,
            });
        }
    }

    let expected_len = vectors.ids.len().checked_mul(dimensions);
    if dimensions == 0 || expected_len != Some(vectors.data.len()) {
        return Err(Error::Corrupt(format!(
            "vector data length {} does not match {} ids of dimension {}",
            vectors.data.len(),
            vectors.ids.len(),
            dimensions
        )));
    }
    if vectors.ids.len() != docstore.entries.len() {
        return Err(Error::Corrupt(format!(
            "vector file has {} entries but docstore has {}",
            vectors.ids.len(),
            docstore.entries.len()
        )));
    }

    let mut entries = Vec::with_capacity(vectors.ids.len());
    for ((id, row), doc) in vectors
        .ids
        .into_iter()
        .zip(vectors.data.chunks_exact(dimensions))
        .zip(docstore.entries)
    {
        if id != doc.id {
            return Err(Error::Corrupt(format!(
                "entry order differs: vector id '{}' vs docstore id '{}'",
                id, doc.id
            )));
        }
        entries.push(IndexEntry::new(id, row.to_vec(), doc.document));
    }

    VectorIndex::build(dimensions, entries)
        .map_err(|e| Error::Corrupt(format!("stored entries are invalid: {}", e)))
}

async fn swap_into_place(staging: &Path, dir: &Path, parent: &Path, name: &str) -> Result<()> {
    let previous = if file_exists(dir).await {
        let old = parent.join(format!(".{}.old-{}", name, uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::rename(dir, &old).await {
            remove_dir_quietly(staging).await;
            return Err(e.into());
        }
        Some(old)
    } else {
        None
    };

    if let Err(e) = tokio::fs::rename(staging, dir).await {
        if let Some(old) = &previous {
            if let Err(restore) = tokio::fs::rename(old, dir).await {
                warn!(error = %restore, path = ?old, "Failed to restore previous index");
            }
        }
        remove_dir_quietly(staging).await;
        return Err(Error::Persistence(format!(
            "Failed to move staged index into place: {}",
            e
        )));
    }

    if let Some(old) = previous {
        remove_dir_quietly(&old).await;
    }
    for stale in previous_generations(dir).await {
        remove_dir_quietly(&stale).await;
    }
    debug!(path = ?dir, "Swapped staged index into place");
    Ok(())
}

/// `.<name>.old-*` siblings of `dir`, sorted by name
async fn previous_generations(dir: &Path) -> Vec<PathBuf> {
    let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let prefix = format!(".{}.old-", name);

    let mut found = Vec::new();
    let Ok(mut read) = tokio::fs::read_dir(parent_of(dir)).await else {
        return found;
    };
    while let Ok(Some(entry)) = read.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            found.push(entry.path());
        }
    }
    found.sort();
    found
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_dir_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        warn!(error = %e, path = ?path, "Failed to remove directory");
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn parent_of(dir: &Path) -> PathBuf {
    match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
