use hkrag_core::types::RetrievalResult;

pub const GROUNDED_PREAMBLE: &str = "You are a helpful AI assistant specializing in Hong Kong healthcare policy.
Use the following context to answer the question. If you don't know, say so.";

pub const UNGROUNDED_PREAMBLE: &str = "You are a helpful assistant. Answer this question about Hong Kong healthcare:";

/// Chunk texts in retrieval order, separated by a blank line.
pub fn build_context(results: &[RetrievalResult]) -> String {
    results.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

pub fn grounded_prompt(context: &str, question: &str) -> String {
    format!("{GROUNDED_PREAMBLE}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:")
}

pub fn ungrounded_prompt(question: &str) -> String {
    format!("{UNGROUNDED_PREAMBLE}\n\n{question}")
}
