use std::sync::LazyLock;

use regex::Regex;

use crate::config::ProcessingConfig;

static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n+").expect("paragraph break regex is valid"));

/// Paragraph-aligned chunker used by the offline indexer.
///
/// Paragraphs are packed greedily until adding the next one would push the
/// chunk past `max_chunk_size` characters. A paragraph is never split, so a
/// single oversized paragraph becomes a chunk of its own.
pub struct TextChunker {
    max_chunk_size: usize,
}

impl TextChunker {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            max_chunk_size: config.max_chunk_size,
        }
    }

    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in PARAGRAPH_BREAK_RE.split(text) {
            let paragraph_len = paragraph.chars().count();

            if current_len + paragraph_len > self.max_chunk_size && current_len > 0 {
                Self::push_trimmed(&mut chunks, &current);
                current = paragraph.to_string();
                current_len = paragraph_len;
            } else {
                if current_len > 0 {
                    current.push_str("\n\n");
                    current_len += 2;
                }
                current.push_str(paragraph);
                current_len += paragraph_len;
            }
        }

        Self::push_trimmed(&mut chunks, &current);
        chunks
    }

    fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
        }
    }
}

pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    TextChunker::with_max_chunk_size(max_chunk_size).chunk(text)
}
