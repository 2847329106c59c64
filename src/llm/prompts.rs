//! Prompt templates for document chat

/// Text with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute placeholders in one pass
    ///
    /// Placeholders without a value are kept verbatim, and substituted values
    /// are never rescanned, so a document containing `{{context}}` cannot
    /// expand itself.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };

            let name = after[..close].trim();
            match values.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after[close + 2..];
        }

        out.push_str(rest);
        out
    }
}

/// Prompt templates used by the chat pipeline
pub struct ChatPrompts;

impl ChatPrompts {
    /// Variables: `system_prompt`, `context`.
    #[must_use]
    pub fn with_context() -> PromptTemplate {
        PromptTemplate::new(
            r"{{system_prompt}}

Context from the user's documents (cite sources by their [number]):

{{context}}",
        )
    }

    /// Used when retrieval found nothing above the threshold
    #[must_use]
    pub fn without_context() -> PromptTemplate {
        PromptTemplate::new(
            r"{{system_prompt}}

No relevant context was found in the user's documents for this question. Say so briefly, then answer from general knowledge.",
        )
    }

    /// Render the system message for the given context block
    #[must_use]
    pub fn system_message(system_prompt: &str, context: Option<&str>) -> String {
        match context {
            Some(context) if !context.trim().is_empty() => Self::with_context()
                .render(&[("system_prompt", system_prompt), ("context", context)]),
            _ => Self::without_context().render(&[("system_prompt", system_prompt)]),
        }
    }
}
