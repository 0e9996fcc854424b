//! Language-agnostic recursive text splitting with token-aware sizing.
//!
//! Splits on paragraph breaks, then newlines, then spaces, then characters —
//! the semantic level hierarchy `text_splitter::TextSplitter` already implements
//! internally — rather than a per-language AST splitter, since the chunking
//! contract here makes no assumptions about source language.

use once_cell::sync::Lazy;
use text_splitter::ChunkConfig;
use text_splitter::TextSplitter;
use tiktoken_rs::CoreBPE;
use tiktoken_rs::cl100k_base;

use crate::error::Error;
use crate::error::Result;
use crate::types::RawChunk;

/// ≈1,000 tokens, matching the ≈4,000 character target in the chunking contract.
pub const DEFAULT_CHUNK_TOKENS: usize = 1_000;
/// ≈200 tokens, matching the ≈800 character overlap target.
pub const DEFAULT_OVERLAP_TOKENS: usize = 200;

static TOKENIZER: Lazy<CoreBPE> =
    Lazy::new(|| cl100k_base().expect("failed to load cl100k_base tokenizer"));

pub struct Chunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TOKENS, DEFAULT_OVERLAP_TOKENS)
    }
}

impl Chunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
        }
    }

    /// Split `content` into a sequence of chunks whose concatenation covers the
    /// file (overlap regions may repeat text). Line numbers are 1-indexed and
    /// computed by counting line terminators up to each chunk's byte offset.
    pub fn chunk(&self, content: &str) -> Result<Vec<RawChunk>> {
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let config = ChunkConfig::new(self.max_tokens)
            .with_sizer(&*TOKENIZER)
            .with_overlap(self.overlap_tokens)
            .map_err(|err| Error::IndexCorrupt {
                reason: "invalid chunk config".to_string(),
                source: Some(Box::new(err)),
            })?;
        let splitter = TextSplitter::new(config);

        let chunks = splitter
            .chunk_indices(content)
            .map(|(offset, text)| to_raw_chunk(content, offset, text))
            .collect();
        Ok(chunks)
    }
}

fn to_raw_chunk(full_content: &str, offset: usize, text: &str) -> RawChunk {
    let start_line = full_content[..offset].lines().count() as u32 + 1;
    let line_count = text.lines().count().max(1) as u32;
    let end_line = start_line + line_count - 1;
    RawChunk {
        text: text.to_string(),
        start_line,
        end_line: end_line.max(start_line),
    }
}

#[cfg(test)]
#[path = "splitter.test.rs"]
mod tests;
