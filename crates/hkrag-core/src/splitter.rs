//! Character-window splitter with separator-aware boundaries.
//!
//! Every chunk is an exact substring of its document, at most `chunk_size`
//! characters long. Consecutive chunks share at most `chunk_overlap` characters
//! and together cover the whole document, so dropping the shared prefix of each
//! chunk reproduces the original text. Boundaries prefer paragraph breaks, then
//! line breaks, then spaces, and fall back to a hard cut.

use std::collections::HashMap;

use crate::error::Error;
use crate::types::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

/// A span of a document: `start` is a character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub text: String,
}

impl TextSpan {
    pub fn end(&self) -> usize { self.start + self.text.chars().count() }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl Default for TextSplitter {
    fn default() -> Self { Self { config: ChunkingConfig::default() } }
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, Error> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Split one text into ordered spans. Blank text yields no spans.
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut spans = Vec::new();
        let mut start = 0usize;
        loop {
            let hard_end = (start + size).min(n);
            let end = if hard_end == n { n } else { find_break(&chars, start, hard_end, start + overlap).unwrap_or(hard_end) };
            spans.push(TextSpan { start, text: chars[start..end].iter().collect() });
            if end >= n {
                break;
            }
            start = next_start(&chars, end, overlap);
        }
        spans
    }

    /// Split documents in input order. Chunks are numbered per `source_id`,
    /// so multi-page sources get unique ids across their pages.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut next_index: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            for span in self.split_text(&doc.content) {
                let index = next_index.entry(doc.source_id.as_str()).or_insert(0);
                chunks.push(Chunk {
                    id: format!("{}:{}", doc.source_id, index),
                    source_id: doc.source_id.clone(),
                    doc_type: doc.doc_type.clone(),
                    text: span.text,
                    start_offset: span.start,
                    chunk_index: *index,
                    total_chunks: 0,
                });
                *index += 1;
            }
        }
        for chunk in &mut chunks {
            chunk.total_chunks = next_index.get(chunk.source_id.as_str()).copied().unwrap_or(0);
        }
        chunks
    }
}

/// Latest boundary in `(min_break, hard_end]` right after the highest-priority
/// separator that occurs there.
fn find_break(chars: &[char], start: usize, hard_end: usize, min_break: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let sep: Vec<char> = sep.chars().collect();
        if hard_end < start + sep.len() {
            continue;
        }
        let mut i = hard_end - sep.len();
        loop {
            let brk = i + sep.len();
            if brk <= min_break {
                break;
            }
            if chars[i..brk] == sep[..] {
                return Some(brk);
            }
            if i == start {
                break;
            }
            i -= 1;
        }
    }
    None
}

/// Start of the next window: at most `overlap` characters before `end`,
/// moved forward to the first word start inside the overlap when there is one.
fn next_start(chars: &[char], end: usize, overlap: usize) -> usize {
    let earliest = end - overlap;
    (earliest..end)
        .find(|&q| q > 0 && chars[q - 1].is_whitespace() && !chars[q].is_whitespace())
        .unwrap_or(earliest)
}
