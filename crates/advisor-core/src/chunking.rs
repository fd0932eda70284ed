//! Deterministic character sliding window.
//!
//! Windows are measured in characters but reported as byte offsets so a chunk
//! can always be recovered as `&text[start..end]`.

use crate::error::IngestionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    size: usize,
    overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, IngestionError> {
        if size == 0 {
            return Err(IngestionError::InvalidChunking(
                "chunk size must be > 0".into(),
            ));
        }
        if overlap >= size {
            return Err(IngestionError::InvalidChunking(format!(
                "chunk overlap {overlap} must be smaller than chunk size {size}"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }

    /// Number of windows for a text of `len_chars` characters.
    pub fn expected_chunks(&self, len_chars: usize) -> usize {
        match len_chars {
            0 => 0,
            n if n <= self.size => 1,
            n => (n - self.overlap).div_ceil(self.stride()),
        }
    }
}

/// Byte range of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

pub fn window_spans(text: &str, config: &ChunkingConfig) -> Vec<Span> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = boundaries.len() - 1;
    if n_chars == 0 {
        return Vec::new();
    }

    let mut spans = Vec::with_capacity(config.expected_chunks(n_chars));
    let mut start = 0;
    loop {
        let end = (start + config.size).min(n_chars);
        spans.push(Span {
            start: boundaries[start],
            end: boundaries[end],
        });
        if end >= n_chars {
            break;
        }
        start += config.stride();
    }
    spans
}
