use std::path::{Path, PathBuf};

use crate::error::{DonjedError, Result};
use crate::knowledge::KnowledgeBase;
use crate::models::DocumentChunk;

use super::TextChunker;

const INDEXED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Build a knowledge base from every text document in `dir`.
///
/// Files are visited in name order so chunk ids are stable across runs. A
/// file that cannot be read is skipped with a warning.
pub fn index_directory(dir: impl AsRef<Path>, max_chunk_size: usize) -> Result<KnowledgeBase> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(DonjedError::Validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let files = collect_documents(dir)?;
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "No text documents found to index");
    } else {
        tracing::info!(dir = %dir.display(), files = files.len(), "Indexing documents");
    }

    let chunker = TextChunker::with_max_chunk_size(max_chunk_size);
    let mut documents = Vec::new();

    for path in files {
        let Some(source) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
            continue;
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                continue;
            }
        };

        let chunks = chunker.chunk(&text.replace("\r\n", "\n"));
        tracing::info!(source, chunks = chunks.len(), "Chunked document");

        documents.extend(
            chunks
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| DocumentChunk::new(source, index, chunk, 1)),
        );
    }

    Ok(KnowledgeBase::build(documents))
}

fn collect_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();

    files.sort();
    Ok(files)
}
