//! Paragraph-boundary text chunker
//!
//! Splits document text into chunks that respect a `max_tokens` limit.
//! Paragraphs (separated by a line holding only whitespace, so `\r\n` line
//! endings split the same way as `\n`) are packed greedily; a paragraph
//! that alone exceeds the limit is hard-split at the last whitespace before
//! the limit.

use crate::models::ChunkMetadata;
use crate::models::NewChunk;

/// Approximate chars-per-token ratio
pub const CHARS_PER_TOKEN: usize = 4;

/// Token estimate used for chunk sizing: `ceil(chars / 4)`
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Split text into chunks with contiguous indices starting at 0
///
/// Whitespace-only text yields no chunks. `start_offset` in the metadata is
/// the byte offset of the chunk's first character in `text`.
#[must_use]
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<NewChunk> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;

    let mut pieces: Vec<(usize, String)> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    let mut current_start = 0;

    for (para_start, para) in paragraphs(text) {
        let para_chars = para.chars().count();

        // +2 for the \n\n separator
        let would_be = if current.is_empty() {
            para_chars
        } else {
            current_chars + 2 + para_chars
        };

        if would_be > max_chars && !current.is_empty() {
            pieces.push((current_start, std::mem::take(&mut current)));
            current_chars = 0;
        }

        if para_chars > max_chars {
            for (start, piece) in hard_split(para, max_chars) {
                pieces.push((para_start + start, piece.to_string()));
            }
        } else {
            if current.is_empty() {
                current_start = para_start;
            } else {
                current.push_str("\n\n");
                current_chars += 2;
            }
            current.push_str(para);
            current_chars += para_chars;
        }
    }

    if !current.is_empty() {
        pieces.push((current_start, current));
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, (start, content))| NewChunk {
            chunk_index: index,
            token_count: estimate_tokens(&content),
            metadata: ChunkMetadata {
                index,
                start_offset: Some(start),
            },
            content,
            embedding: None,
        })
        .collect()
}

/// Trimmed paragraphs of `text` with their byte offsets
///
/// Any line that is empty or whitespace-only ends a paragraph.
fn paragraphs(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut para_start: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(start) = para_start.take() {
                out.push(trimmed_span(text, start, offset));
            }
        } else if para_start.is_none() {
            para_start = Some(offset);
        }
        offset += line.len();
    }
    if let Some(start) = para_start {
        out.push(trimmed_span(text, start, text.len()));
    }

    out
}

fn trimmed_span(text: &str, start: usize, end: usize) -> (usize, &str) {
    let span = &text[start..end];
    let lead = span.len() - span.trim_start().len();
    (start + lead, span.trim())
}

/// Split an oversized paragraph into pieces of at most `max_chars` chars
///
/// Returns `(byte offset, piece)` pairs. Splits never fall inside a UTF-8
/// sequence; a run without whitespace is cut at exactly `max_chars`.
fn hard_split(text: &str, max_chars: usize) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        let skip = rest.len() - rest.trim_start().len();
        start += skip;
        if start >= text.len() {
            break;
        }
        let rest = &text[start..];

        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);

        let end = if limit < rest.len() {
            rest[..limit]
                .rfind(char::is_whitespace)
                .filter(|&pos| pos > 0)
                .unwrap_or(limit)
        } else {
            limit
        };

        let piece = rest[..end].trim_end();
        if !piece.is_empty() {
            pieces.push((start, piece));
        }
        start += end;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].token_count, 4);
        assert_eq!(chunks[0].metadata.start_offset, Some(0));
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500).is_empty());
        assert!(chunk_text("  \n\n \t\n\n", 500).is_empty());
    }

    #[test]
    fn test_multiple_paragraphs_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text(text, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_paragraphs_packed_greedily() {
        // max_tokens=10 => max_chars=40
        let text = "Paragraph number one.\n\nParagraph two.\n\nParagraph number three.";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Paragraph number one.\n\nParagraph two.");
        assert_eq!(chunks[1].content, "Paragraph number three.");
        assert_eq!(
            chunks[1].metadata.start_offset,
            text.find("Paragraph number three.")
        );
    }

    #[test]
    fn test_oversized_paragraph_splits_on_whitespace() {
        // max_tokens=5 => max_chars=20
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 5);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 20);
            assert_eq!(chunk.content, chunk.content.trim());
            assert!(!chunk.content.is_empty());
        }
        let rejoined = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_hard_split_multibyte_without_whitespace() {
        let text = "é".repeat(50);
        let chunks = chunk_text(&text, 5);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.chars().count(), 20);
        assert_eq!(chunks[2].content.chars().count(), 10);
        assert_eq!(chunks[1].metadata.start_offset, Some("é".len() * 20));
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {i}."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i, "Index mismatch at position {i}");
            assert_eq!(c.metadata.index, i);
        }
    }

    #[test]
    fn test_crlf_blank_lines_separate_paragraphs() {
        let text = "Vacation is 25 days.\r\n\r\nParking is free for all staff.";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Vacation is 25 days.");
        assert_eq!(chunks[1].content, "Parking is free for all staff.");
        assert_eq!(chunks[1].metadata.start_offset, text.find("Parking"));
    }

    #[test]
    fn test_whitespace_only_line_separates_paragraphs() {
        let text = "Vacation is 25 days.\n  \t\nParking is free for all staff.\r\n";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "Parking is free for all staff.");

        let packed = chunk_text(text, 500);
        assert_eq!(packed.len(), 1);
        assert_eq!(
            packed[0].content,
            "Vacation is 25 days.\n\nParking is free for all staff."
        );
    }

    #[test]
    fn test_single_line_breaks_stay_in_paragraph() {
        let text = "Line one\r\nline two";
        let chunks = chunk_text(text, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_offsets_point_into_source() {
        let text = "  Intro line.\n\n\n\nBody text here.\n\n";
        let chunks = chunk_text(text, 3);
        for chunk in &chunks {
            let start = chunk.metadata.start_offset.unwrap();
            assert!(text[start..].starts_with(&chunk.content[..5]));
        }
    }
}
