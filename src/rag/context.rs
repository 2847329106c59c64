//! Context assembly from retrieved chunks

use crate::models::Source;
use crate::rag::RetrievedChunk;

/// Assembler for creating a numbered context block from retrieved chunks
pub struct ContextAssembler {
    max_context_length: usize,
}

impl ContextAssembler {
    /// Create a new context assembler bounded to `max_context_length` chars
    #[must_use]
    pub const fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    /// Leading chunks that fit in the budget
    ///
    /// The best match is always kept, truncated if it alone exceeds the
    /// budget, so a non-empty retrieval never yields an empty context.
    #[must_use]
    pub fn select<'a>(&self, chunks: &'a [RetrievedChunk]) -> &'a [RetrievedChunk] {
        let mut total_length = 0;
        let mut count = 0;

        for (idx, chunk) in chunks.iter().enumerate() {
            let entry_length = Self::format_entry(idx, chunk).chars().count();
            if count > 0 && total_length + entry_length > self.max_context_length {
                break;
            }
            total_length += entry_length;
            count += 1;
        }

        &chunks[..count]
    }

    /// Assemble context from retrieved chunks
    ///
    /// Each entry is `[n] <document title>` followed by the chunk text, so
    /// the model can cite sources by number.
    #[must_use]
    pub fn assemble(&self, chunks: &[RetrievedChunk]) -> String {
        let mut context = String::new();

        for (idx, chunk) in self.select(chunks).iter().enumerate() {
            context.push_str(&Self::format_entry(idx, chunk));
        }

        if context.chars().count() > self.max_context_length {
            context = context.chars().take(self.max_context_length).collect();
        }

        context.trim_end().to_string()
    }

    /// Citations for the chunks that make it into the context
    #[must_use]
    pub fn sources(&self, chunks: &[RetrievedChunk]) -> Vec<Source> {
        self.select(chunks).iter().map(Source::from).collect()
    }

    fn format_entry(idx: usize, chunk: &RetrievedChunk) -> String {
        format!(
            "[{}] {}\n{}\n\n",
            idx + 1,
            chunk.document_title,
            chunk.content.trim()
        )
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(8000)
    }
}
