use crate::models::SearchResult;

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

/// Render ranked results as the documentation block of the system prompt.
///
/// Each result becomes `[Source {n}: {source}]\n{text}` with `n` starting at
/// one, in input order. No results yields an empty string.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[Source {}: {}]\n{}",
                i + 1,
                result.chunk.source,
                result.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR)
}
