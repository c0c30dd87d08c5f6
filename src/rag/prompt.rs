//! Grounded prompt construction.
//!
//! Rendering is pure: the same query and contexts always produce the same
//! bytes, and contexts appear in exactly the order given.

use crate::types::ScoredFragment;
use crate::utils::config::PromptConfig;

/// Renders retrieved fragments and the question into one instruction prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
    corpus: String,
    max_bullets: usize,
    max_words: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

impl PromptBuilder {
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            language: config.language.clone(),
            corpus: config.corpus.clone(),
            max_bullets: config.max_bullets,
            max_words: config.max_words,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Numbered, source-annotated context block, one entry per fragment.
    pub fn context_block(contexts: &[ScoredFragment]) -> String {
        contexts
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] (source: {})\n{}", i + 1, c.source(), c.text()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build(&self, query: &str, contexts: &[ScoredFragment]) -> String {
        format!(
            "Using only the following context (fragments retrieved from the {corpus}), answer directly in {language}.\n\
             If the answer is not in the texts, say honestly that it does not appear in the {corpus}.\n\
             Answer in at most {bullets} bullet points and no more than {words} words.\n\
             \n\
             Question: {query}\n\
             \n\
             Context:\n\
             {block}\n\
             \n\
             Instructions:\n\
             - Combine and summarise the relevant information.\n\
             - At the end, add a \"Sources\" section listing the fragment indices used (e.g. [1], [3]) and their file names.\n",
            corpus = self.corpus,
            language = self.language,
            bullets = self.max_bullets,
            words = self.max_words,
            query = query,
            block = Self::context_block(contexts),
        )
    }
}
