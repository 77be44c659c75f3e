//! Paragraph-aware text chunking

use crate::config::ProcessingConfig;
use crate::extract::{Chunk, Processed, SourceInfo, TextProcessor};
use crate::CrawlResult;
use serde_json::json;

/// Rough token estimate: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 + 3) / 4
}

/// Splits text into chunks of at most `chunk_size` characters
///
/// Paragraphs (blank-line separated) are kept whole when they fit. Each new
/// chunk starts with up to `chunk_overlap` trailing characters of the previous
/// one so context carries across boundaries.
#[derive(Debug, Clone)]
pub struct ChunkingProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Splits text into chunk strings
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for unit in self.units(text) {
            if current.is_empty() {
                current = unit;
                continue;
            }

            if char_len(&current) + 2 + char_len(&unit) <= self.chunk_size {
                current.push_str("\n\n");
                current.push_str(&unit);
                continue;
            }

            let tail = overlap_tail(&current, self.chunk_overlap);
            chunks.push(std::mem::take(&mut current));

            current = if !tail.is_empty() && char_len(&tail) + 1 + char_len(&unit) <= self.chunk_size
            {
                format!("{} {}", tail, unit)
            } else {
                unit
            };
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Breaks text into paragraphs no longer than `chunk_size`
    fn units(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();

        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if char_len(paragraph) <= self.chunk_size {
                units.push(paragraph.to_string());
            } else {
                units.extend(hard_split(paragraph, self.chunk_size));
            }
        }

        units
    }
}

impl TextProcessor for ChunkingProcessor {
    fn process(&self, text: &str, source: &SourceInfo) -> CrawlResult<Processed> {
        let pieces = self.split(text);
        let total_chunks = pieces.len();

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let token_count = estimate_tokens(&content);
                let metadata = json!({
                    "url": source.url,
                    "title": source.title,
                    "chunk_index": index,
                    "total_chunks": total_chunks,
                    "token_count": token_count,
                    "char_count": char_len(&content),
                });
                Chunk {
                    content,
                    token_count,
                    metadata,
                }
            })
            .collect();

        Ok(Processed {
            success: !chunks.is_empty(),
            chunks,
        })
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits an oversized paragraph, preferring whitespace boundaries
fn hard_split(paragraph: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + size).min(chars.len());

        if end < chars.len() {
            if let Some(space) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if space > 0 {
                    end = start + space;
                }
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }

        start = end;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }

    pieces
}

/// Returns up to `overlap` trailing characters, starting at a word boundary
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return text.trim().to_string();
    }

    let tail = &chars[chars.len() - overlap..];
    let start = tail
        .iter()
        .position(|c| c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);

    tail[start..].iter().collect::<String>().trim().to_string()
}
