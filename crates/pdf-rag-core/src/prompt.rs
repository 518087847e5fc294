//! Prompt assembly for answer generation.
//!
//! Context and citations are both derived from the same hit list, so every
//! citation points at text the model actually received.

use crate::models::{Citation, ScoredChunk};

/// Template used for every question. `{context}` and `{question}` are
/// substituted verbatim.
pub const PROMPT_TEMPLATE: &str = "Use the following context to answer the question.\n\
{context}\n\
Question: {question}\n";

/// Separator placed between retrieved chunk texts.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Join hit texts in rank order.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Fill [`PROMPT_TEMPLATE`].
///
/// The question is substituted after the context so that a literal
/// `{question}` inside document text is left untouched.
pub fn render_prompt(context: &str, question: &str) -> String {
    let (head, tail) = PROMPT_TEMPLATE
        .split_once("{context}")
        .unwrap_or((PROMPT_TEMPLATE, ""));
    format!("{}{}{}", head, context, tail.replace("{question}", question))
}

/// Citations in rank order, one per hit.
pub fn citations(hits: &[ScoredChunk]) -> Vec<Citation> {
    hits.iter().map(|h| h.chunk.citation()).collect()
}
