//! Query pipeline: question → vector → top-k chunks → prompt → answer.

use pdf_rag_core::models::QueryAnswer;
use pdf_rag_core::prompt::{build_context, citations, render_prompt};
use pdf_rag_core::{RagError, Result};

use crate::pipeline::Pipeline;

impl Pipeline {
    /// Answer `question` from the indexed documents.
    ///
    /// `max_output_tokens` defaults to the configured default and must lie
    /// within the configured range. Citations follow retrieval rank and
    /// cover exactly the chunks placed in the prompt.
    pub async fn answer(
        &self,
        question: &str,
        max_output_tokens: Option<u32>,
    ) -> Result<QueryAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::invalid_input("question must not be empty"));
        }

        let settings = &self.settings;
        let max_tokens = max_output_tokens.unwrap_or(settings.default_output_tokens);
        if max_tokens < settings.min_output_tokens || max_tokens > settings.max_output_tokens {
            return Err(RagError::invalid_input(format!(
                "max_output_tokens must be between {} and {}, got {}",
                settings.min_output_tokens, settings.max_output_tokens, max_tokens
            )));
        }

        let query_vec = self.embedder.embed_query(question).await?;
        let hits = self.index.search(&query_vec, settings.top_k).await?;
        if hits.is_empty() {
            tracing::warn!("no chunks retrieved, asking without context");
        }

        let prompt = render_prompt(&build_context(&hits), question);
        tracing::debug!(hits = hits.len(), prompt_chars = prompt.len(), "prompt built");

        let answer = self.completion.complete(&prompt, max_tokens).await?;
        let citations = citations(&hits);

        tracing::info!(citations = citations.len(), max_tokens, "answered question");
        Ok(QueryAnswer { answer, citations })
    }
}
