//! Overlapping text chunking for indexing.
//!
//! Chunks accumulate whole sentences up to the size limit, carrying a tail
//! of the previous chunk forward so retrieval does not lose context at
//! boundaries. Sizes are in characters, not bytes.

use tracing::info;

/// One indexable chunk of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// `{segment_id}_chunk_{index}`.
    pub id: String,
    /// Chunk text, trimmed.
    pub text: String,
    /// Position of this chunk within the segment.
    pub index: usize,
    /// The segment this chunk belongs to.
    pub segment_id: String,
}

/// Splits text into overlapping chunks while keeping sentences intact.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(512, 100)
    }
}

impl TextChunker {
    /// Create a chunker. The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into overlapping chunks.
    pub fn chunk(&self, text: &str, segment_id: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let has_terminator = text.chars().any(|c| matches!(c, '.' | '!' | '?'));
        let sentences = split_sentences(text);
        if sentences.is_empty() || !has_terminator {
            return self.simple_chunk(text, segment_id);
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            let candidate_len = current.chars().count() + sentence.chars().count();
            if candidate_len <= self.chunk_size {
                current.push_str(&sentence);
            } else if current.is_empty() {
                // A single sentence larger than the chunk size becomes its
                // own oversized chunk.
                current = sentence;
            } else {
                push_chunk(&mut chunks, &current, segment_id);
                let overlap = self.overlap_tail(&current);
                current = overlap + &sentence;
            }
        }
        if !current.trim().is_empty() {
            push_chunk(&mut chunks, &current, segment_id);
        }

        info!(segment_id, count = chunks.len(), "chunked text");
        chunks
    }

    /// The last `chunk_overlap` characters of a chunk, trimmed.
    fn overlap_tail(&self, text: &str) -> String {
        let total = text.chars().count();
        if total <= self.chunk_overlap {
            return text.trim().to_string();
        }
        text.chars()
            .skip(total - self.chunk_overlap)
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Character-window fallback for text without sentence punctuation.
    fn simple_chunk(&self, text: &str, segment_id: &str) -> Vec<Chunk> {
        let step = (self.chunk_size - self.chunk_overlap).max(1);
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();

        let mut start = 0;
        while start < chars.len() {
            let window: String = chars[start..(start + self.chunk_size).min(chars.len())]
                .iter()
                .collect();
            if !window.trim().is_empty() {
                push_chunk(&mut chunks, &window, segment_id);
            }
            start += step;
        }
        chunks
    }

    /// Rebuild the segment text from its chunks, removing carried overlaps.
    pub fn reconstruct(chunks: &[Chunk]) -> String {
        let mut sorted: Vec<&Chunk> = chunks.iter().collect();
        sorted.sort_by_key(|c| c.index);

        let mut reconstructed = String::new();
        for chunk in sorted {
            if reconstructed.is_empty() {
                reconstructed.push_str(&chunk.text);
                continue;
            }
            // Drop the longest prefix of this chunk that the accumulated
            // text already ends with.
            let boundaries: Vec<usize> = chunk
                .text
                .char_indices()
                .map(|(i, _)| i)
                .chain([chunk.text.len()])
                .collect();
            let skip = boundaries
                .iter()
                .rev()
                .find(|&&i| reconstructed.ends_with(&chunk.text[..i]))
                .copied()
                .unwrap_or(0);
            reconstructed.push_str(&chunk.text[skip..]);
        }
        reconstructed
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, text: &str, segment_id: &str) {
    let index = chunks.len();
    chunks.push(Chunk {
        id: format!("{segment_id}_chunk_{index}"),
        text: text.trim().to_string(),
        index,
        segment_id: segment_id.to_string(),
    });
}

/// Sentence pieces with a trailing space, ready for re-accumulation.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            if !current.trim().is_empty() {
                sentences.push(format!("{} ", current.trim()));
            }
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}
