use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::{DonjedError, Result};
use crate::models::DocumentChunk;

const ARTIFACT_VERSION: &str = "1.0";

/// Immutable snapshot of the pre-chunked document corpus.
///
/// Produced offline (see `processing::index_directory`) and loaded once at
/// boot. Shared read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub documents: Vec<DocumentChunk>,
}

impl KnowledgeBase {
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Stamp a fresh artifact around already-chunked documents.
    pub fn build(documents: Vec<DocumentChunk>) -> Self {
        let total_documents = documents
            .iter()
            .map(|chunk| chunk.source.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            version: ARTIFACT_VERSION.to_string(),
            generated_at: Utc::now(),
            total_documents,
            total_chunks: documents.len(),
            documents,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let kb: KnowledgeBase = serde_json::from_str(json)?;
        kb.validate()?;
        Ok(kb)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let kb = Self::from_json(&raw).map_err(|e| match e {
            DonjedError::Json(err) => DonjedError::KnowledgeBase(format!(
                "Failed to parse knowledge base {}: {err}",
                path.display()
            )),
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            documents = kb.total_documents,
            chunks = kb.documents.len(),
            version = %kb.version,
            "Knowledge base loaded"
        );

        Ok(kb)
    }

    /// Load the artifact, or start empty when the file does not exist.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Knowledge base not found - answers will not be grounded in documentation"
            );
            return Ok(Self::empty());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Chunk indices must be contiguous from zero per source and ids must
    /// follow `{source}_chunk_{index}`.
    fn validate(&self) -> Result<()> {
        let mut indices: HashMap<&str, Vec<usize>> = HashMap::new();

        for chunk in &self.documents {
            let expected = DocumentChunk::chunk_id(&chunk.source, chunk.metadata.chunk_index);
            if chunk.id != expected {
                return Err(DonjedError::KnowledgeBase(format!(
                    "Chunk id '{}' does not match expected '{expected}'",
                    chunk.id
                )));
            }
            indices
                .entry(chunk.source.as_str())
                .or_default()
                .push(chunk.metadata.chunk_index);
        }

        for (source, mut seen) in indices {
            seen.sort_unstable();
            if seen.iter().enumerate().any(|(i, index)| i != *index) {
                return Err(DonjedError::KnowledgeBase(format!(
                    "Chunk indices for source '{source}' are not contiguous from zero"
                )));
            }
        }

        if self.total_chunks != self.documents.len() {
            tracing::warn!(
                declared = self.total_chunks,
                actual = self.documents.len(),
                "Knowledge base chunk count does not match its header"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(chunks: &str) -> String {
        format!(
            r#"{{
                "version": "1.0",
                "generatedAt": "2025-01-10T12:00:00Z",
                "totalDocuments": 1,
                "totalChunks": 2,
                "documents": [{chunks}]
            }}"#
        )
    }

    fn chunk_json(source: &str, index: usize, text: &str) -> String {
        format!(
            r#"{{"id": "{source}_chunk_{index}", "text": "{text}", "source": "{source}",
                "metadata": {{"fileName": "{source}", "totalPages": 3, "chunkIndex": {index}}}}}"#
        )
    }

    #[test]
    fn test_from_json_valid_artifact() {
        let json = artifact(&format!(
            "{},{}",
            chunk_json("catalog", 0, "Inverters"),
            chunk_json("catalog", 1, "Batteries")
        ));
        let kb = KnowledgeBase::from_json(&json).expect("valid artifact");

        assert_eq!(kb.version, "1.0");
        assert_eq!(kb.chunks().len(), 2);
        assert_eq!(kb.chunks()[1].text, "Batteries");
    }

    #[test]
    fn test_from_json_rejects_gap_in_chunk_indices() {
        let json = artifact(&format!(
            "{},{}",
            chunk_json("catalog", 0, "Inverters"),
            chunk_json("catalog", 2, "Batteries")
        ));
        let err = KnowledgeBase::from_json(&json).unwrap_err();
        assert!(matches!(err, DonjedError::KnowledgeBase(_)));
    }

    #[test]
    fn test_from_json_rejects_mismatched_id() {
        let json = artifact(
            r#"{"id": "other_chunk_0", "text": "x", "source": "catalog",
                "metadata": {"fileName": "catalog", "totalPages": 1, "chunkIndex": 0}}"#,
        );
        assert!(KnowledgeBase::from_json(&json).is_err());
    }

    #[test]
    fn test_build_counts_distinct_sources() {
        let kb = KnowledgeBase::build(vec![
            DocumentChunk::new("a", 0, "one".into(), 1),
            DocumentChunk::new("a", 1, "two".into(), 1),
            DocumentChunk::new("b", 0, "three".into(), 1),
        ]);
        assert_eq!(kb.total_documents, 2);
        assert_eq!(kb.total_chunks, 3);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kb.json");
        let kb = KnowledgeBase::build(vec![DocumentChunk::new("faq", 0, "Warranty".into(), 1)]);

        kb.save(&path).expect("save");
        let loaded = KnowledgeBase::load(&path).expect("load");
        assert_eq!(loaded, kb);
    }

    #[test]
    fn test_load_or_empty_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kb = KnowledgeBase::load_or_empty(dir.path().join("missing.json")).expect("empty");
        assert!(kb.is_empty());
    }
}
