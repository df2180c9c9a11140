use crate::db::{chunk_entry, IndexHandle};
use crate::llm::GatewayClient;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::EmbeddingService;
use crate::rag::fetch::DocumentFetcher;
use crate::types::{AppError, Document, Result};
use crate::utils::toml_config::DocQaConfig;
use docqa_vector::VectorIndex;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

const FETCH_CONCURRENCY: usize = 4;

/// A source URL that could not be loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub url: String,
    pub error: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub urls_attempted: usize,
    pub documents_loaded: usize,
    pub failures: Vec<SourceFailure>,
    pub chunks: usize,
    pub embedding_batches: usize,
    pub dimensions: usize,
    pub index_dir: PathBuf,
    pub duration_ms: u64,
}

/// Fetch, chunk, embed, index, persist
///
/// Runs are exclusive: a second run while one is in flight, in this process
/// or another one sharing the index directory, fails with
/// [`AppError::IngestionInProgress`].
pub struct IngestionPipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    chunker: TextChunker,
    embeddings: EmbeddingService,
    index_dir: PathBuf,
    running: Arc<Mutex<()>>,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        gateway: Arc<dyn GatewayClient>,
        chunker: TextChunker,
        embed_batch_size: usize,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            chunker,
            embeddings: EmbeddingService::new(gateway, embed_batch_size),
            index_dir: index_dir.into(),
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(
        config: &DocQaConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Result<Self> {
        Ok(Self::new(
            fetcher,
            gateway,
            TextChunker::from_config(&config.chunking)?,
            config.ingestion.embed_batch_size,
            config.ingestion.index_dir.clone(),
        ))
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Whether a run is currently in flight in this process
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Build a fresh index and persist it, replacing the previous one only
    /// once the new one is complete on disk
    #[instrument(skip(self, urls), fields(urls = urls.len(), dir = ?self.index_dir))]
    pub async fn ingest(&self, urls: &[String]) -> Result<(VectorIndex, IngestionReport)> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| AppError::IngestionInProgress)?;
        self.run_exclusive(urls).await
    }

    /// [`Self::ingest`], then publish the new index to a live handle
    pub async fn ingest_and_swap(
        &self,
        urls: &[String],
        handle: &IndexHandle,
    ) -> Result<IngestionReport> {
        let (index, report) = self.ingest(urls).await?;
        handle.publish(index);
        Ok(report)
    }

    /// Claim the runner slot and the directory lock now, then ingest on a
    /// background task
    ///
    /// Fails immediately with [`AppError::IngestionInProgress`] if a run is
    /// already in flight here or in another process; otherwise the new index
    /// is published to `handle` when the task succeeds.
    pub fn spawn_ingest_and_swap(
        self: &Arc<Self>,
        urls: Vec<String>,
        handle: IndexHandle,
    ) -> Result<JoinHandle<Result<IngestionReport>>> {
        let guard = self
            .running
            .clone()
            .try_lock_owned()
            .map_err(|_| AppError::IngestionInProgress)?;
        let lock = IngestLock::acquire(&self.index_dir)?;
        let pipeline = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let _running = guard;
            let result = pipeline.run_locked(lock, &urls).await;
            match result {
                Ok((index, report)) => {
                    handle.publish(index);
                    Ok(report)
                }
                Err(e) => {
                    warn!(error = %e, "Background ingestion failed; serving index unchanged");
                    Err(e)
                }
            }
        }))
    }

    async fn run_exclusive(&self, urls: &[String]) -> Result<(VectorIndex, IngestionReport)> {
        let lock = IngestLock::acquire(&self.index_dir)?;
        self.run_locked(lock, urls).await
    }

    async fn run_locked(
        &self,
        _lock: IngestLock,
        urls: &[String],
    ) -> Result<(VectorIndex, IngestionReport)> {
        let started = Instant::now();
        let (index, mut report) = self.build(urls).await?;

        docqa_vector::save_index(&index, &self.index_dir).await?;

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            documents = report.documents_loaded,
            failed = report.failures.len(),
            chunks = report.chunks,
            batches = report.embedding_batches,
            duration_ms = report.duration_ms,
            "Ingestion complete"
        );
        Ok((index, report))
    }

    /// Build an index in memory without touching disk
    pub async fn build(&self, urls: &[String]) -> Result<(VectorIndex, IngestionReport)> {
        let started = Instant::now();
        let (documents, failures) = self.fetch_all(urls).await;

        if documents.is_empty() {
            return Err(AppError::NoDocumentsLoaded {
                attempted: urls.len(),
            });
        }

        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| self.chunker.split(doc))
            .collect();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Chunked documents"
        );

        let (vectors, batches) = self.embeddings.embed_all(&texts).await?;
        let dimensions = self.embeddings.dimensions();

        let entries = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk_entry(chunk, vector));
        let index = VectorIndex::build(dimensions, entries).map_err(|e| {
            AppError::Configuration(format!(
                "Embeddings do not fit an index of dimension {}: {}",
                dimensions, e
            ))
        })?;

        let report = IngestionReport {
            urls_attempted: urls.len(),
            documents_loaded: documents.len(),
            failures,
            chunks: chunks.len(),
            embedding_batches: batches,
            dimensions,
            index_dir: self.index_dir.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        Ok((index, report))
    }

    async fn fetch_all(&self, urls: &[String]) -> (Vec<Document>, Vec<SourceFailure>) {
        let mut seen = HashSet::new();
        let unique: Vec<String> = urls
            .iter()
            .filter(|url| {
                let fresh = seen.insert(url.as_str());
                if !fresh {
                    warn!(url = %url, "Skipping duplicate source URL");
                }
                fresh
            })
            .cloned()
            .collect();

        let results: Vec<(String, Result<Document>)> = stream::iter(unique)
            .map(|url| async move {
                let result = self.fetcher.fetch(&url).await;
                (url, result)
            })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for (url, result) in results {
            match result {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to load source, skipping");
                    failures.push(SourceFailure {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }
        (documents, failures)
    }
}

/// Advisory lock on `<index_dir>.lock` that keeps two processes from
/// ingesting into the same directory
///
/// The OS releases the lock when the holder exits, so a crashed run never
/// blocks later ones. The file itself stays behind and only records the
/// last holder's pid.
struct IngestLock {
    file: File,
    path: PathBuf,
}

impl IngestLock {
    fn acquire(index_dir: &Path) -> Result<Self> {
        let path = lock_path(index_dir);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                AppError::Internal(format!("Failed to open ingestion lock {:?}: {}", path, e))
            })?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                warn!(lock = ?path, "Ingestion lock is held by another run");
                return Err(AppError::IngestionInProgress);
            }
            Err(TryLockError::Error(e)) => {
                return Err(AppError::Internal(format!(
                    "Failed to lock {:?}: {}",
                    path, e
                )));
            }
        }

        if let Err(e) = file
            .set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
        {
            warn!(lock = ?path, error = %e, "Failed to record pid in ingestion lock");
        }
        debug!(lock = ?path, "Ingestion lock acquired");
        Ok(Self { file, path })
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = ?self.path, error = %e, "Failed to release ingestion lock");
        }
    }
}

/// `<index_dir>.lock`, next to the index directory
pub fn lock_path(index_dir: &Path) -> PathBuf {
    let mut name = index_dir.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
