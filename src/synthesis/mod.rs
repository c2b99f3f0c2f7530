// Answer synthesis capability layer

#[cfg(test)]
mod tests;

pub mod anthropic;

use crate::Result;

pub use anthropic::AnthropicSynthesizer;

/// System instruction sent with every synthesis request
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Given a query and context, \
provide accurate information. Don't hallucinate if the context doesn't provide relevant \
information. Answer directly, don't mention the context. Write your answer in Markdown.";

/// Capability interface over a generative model.
///
/// Implementations use deterministic sampling (temperature 0) so a fixed
/// (context, question) pair is as repeatable as the upstream model permits.
/// Never falls back to returning raw retrieved text as an answer.
pub trait AnswerSynthesizer: Send + Sync {
    fn synthesize(&self, question: &str, context: &str) -> Result<String>;
}

/// Build the single user-role prompt: labeled context block, labeled verbatim
/// question, and the grounding instruction
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Context: The following are relevant passages related to the query.\n\
         {}\n\n\
         Based on the above context, please answer the following question:\n\
         Question: {}\n\n\
         Answer using only the context above. If the context does not contain \
         the answer, say so instead of inventing information.",
        context, question
    )
}
