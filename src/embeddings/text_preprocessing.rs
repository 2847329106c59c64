//! Text cleanup before embedding
//!
//! Chunks are already bounded by the document chunker; this only cleans the
//! text and guards against inputs the embedding API would reject.

use tracing::warn;

use crate::errors::RagChatError;

/// Upper bound in characters sent to the embedding API for one input
pub const MAX_EMBEDDING_CHARS: usize = 8000;

/// Collapse whitespace and control characters to single spaces and cap the length
///
/// Errors when nothing printable remains.
pub fn preprocess_text_for_embedding(text: &str) -> Result<String, RagChatError> {
    let (cleaned, truncated) = clean_text(text, MAX_EMBEDDING_CHARS);

    if cleaned.is_empty() {
        return Err(RagChatError::validation(
            "Cannot embed empty or whitespace-only text",
        ));
    }
    if truncated {
        warn!(
            "Embedding input of {} chars truncated to {}",
            text.chars().count(),
            cleaned.chars().count()
        );
    }

    Ok(cleaned)
}

/// Returns the cleaned text and whether it was cut short
///
/// A cut falls back to the last space when that keeps at least three
/// quarters of the budget, so words are not split needlessly.
fn clean_text(text: &str, max_chars: usize) -> (String, bool) {
    let mut out = String::with_capacity(text.len().min(max_chars * 4));
    let mut count = 0;
    let mut gap = false;
    let mut last_space: Option<(usize, usize)> = None;
    let mut truncated = false;

    for c in text.chars() {
        if c.is_whitespace() || c.is_control() {
            gap = !out.is_empty();
            continue;
        }
        if gap {
            if count + 2 > max_chars {
                truncated = true;
                break;
            }
            last_space = Some((out.len(), count));
            out.push(' ');
            count += 1;
            gap = false;
        }
        if count + 1 > max_chars {
            truncated = true;
            break;
        }
        out.push(c);
        count += 1;
    }

    if truncated {
        if let Some((byte, at)) = last_space {
            if at > max_chars * 3 / 4 {
                out.truncate(byte);
            }
        }
    }

    (out, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace_and_controls() {
        let (cleaned, truncated) = clean_text("  Vacation\r\n\r\npolicy:\t25\x00days  ", 100);
        assert_eq!(cleaned, "Vacation policy: 25 days");
        assert!(!truncated);
        assert_eq!(clean_text("Résumé 📄 attached", 100).0, "Résumé 📄 attached");
    }

    #[test]
    fn test_clean_text_cuts_at_word_boundary() {
        assert_eq!(
            clean_text("parking is free", 13),
            ("parking is".to_string(), true)
        );
        // Boundary too far back: hard cut
        assert_eq!(clean_text("a bcdefghij", 8), ("a bcdefg".to_string(), true));
        // Characters, not bytes
        assert_eq!(clean_text("ééééé", 3), ("ééé".to_string(), true));
    }

    #[test]
    fn test_preprocess_rejects_blank_input() {
        assert!(preprocess_text_for_embedding("").is_err());
        assert!(preprocess_text_for_embedding(" \n\t\x07 ").is_err());
        assert_eq!(
            preprocess_text_for_embedding("Soup\n\nAdd salt.").unwrap(),
            "Soup Add salt."
        );
    }

    #[test]
    fn test_preprocess_truncates_long_text() {
        let long = "chunk ".repeat(5000);
        let processed = preprocess_text_for_embedding(&long).unwrap();
        assert!(processed.chars().count() <= MAX_EMBEDDING_CHARS);
        assert!(processed.ends_with("chunk"));
    }
}
