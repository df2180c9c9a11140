use crate::types::{AppError, Chunk, Document, Result};
use crate::utils::toml_config::ChunkingConfig;

/// Splits documents into overlapping character windows.
///
/// Each chunk is at most `chunk_size` characters. When a chunk has to be cut,
/// the cut prefers the strongest boundary (paragraph, line, sentence, word)
/// within `boundary_lookback` characters of the hard limit, taking the one
/// nearest the limit among equals. The next chunk starts exactly
/// `chunk_overlap` characters before the previous one ended.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    boundary_lookback: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_lookback(chunk_size, chunk_overlap, chunk_size)
    }

    pub fn with_lookback(
        chunk_size: usize,
        chunk_overlap: usize,
        boundary_lookback: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            boundary_lookback,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::with_lookback(
            config.chunk_size,
            config.chunk_overlap,
            config.boundary_lookback,
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        let byte_at: Vec<usize> = document
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(document.text.len()))
            .collect();
        let n = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < n {
            let end = if n - start <= self.chunk_size {
                n
            } else {
                self.cut_point(&chars, start)
            };

            chunks.push(Chunk {
                source: document.source.clone(),
                index: chunks.len(),
                start,
                end,
                text: document.text[byte_at[start]..byte_at[end]].to_string(),
            });

            if end == n {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick where a chunk starting at `start` ends when the rest does not fit.
    fn cut_point(&self, chars: &[char], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        // Cutting at or before start + overlap would stall the scan
        let lower = hard_end
            .saturating_sub(self.boundary_lookback)
            .max(start + self.chunk_overlap + 1);

        let mut best = (0u8, hard_end);
        for pos in lower..=hard_end {
            let rank = boundary_rank(chars, pos);
            if rank > 0 && rank >= best.0 {
                best = (rank, pos);
            }
        }
        best.1
    }
}

/// Strength of a cut between `chars[pos - 1]` and `chars[pos]`.
fn boundary_rank(chars: &[char], pos: usize) -> u8 {
    if pos == 0 {
        return 0;
    }
    let prev = chars[pos - 1];
    let before = pos.checked_sub(2).map(|i| chars[i]);

    if prev == '\n' && before == Some('\n') {
        4
    } else if prev == '\n' {
        3
    } else if prev.is_whitespace() && matches!(before, Some('.' | '!' | '?')) {
        2
    } else if prev.is_whitespace() {
        1
    } else {
        0
    }
}
