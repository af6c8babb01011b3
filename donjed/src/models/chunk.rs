use serde::{Deserialize, Serialize};

/// Provenance of a chunk inside its source document. Not used for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub file_name: String,
    pub total_pages: u32,
    pub chunk_index: usize,
}

/// A bounded, paragraph-aligned fragment of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub metadata: ChunkMetadata,
    /// Precomputed embedding shipped with the artifact, if any. Embeddings
    /// computed at runtime live in `search::EmbeddingCache` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    pub fn new(source: &str, chunk_index: usize, text: String, total_pages: u32) -> Self {
        Self {
            id: Self::chunk_id(source, chunk_index),
            text,
            source: source.to_string(),
            metadata: ChunkMetadata {
                file_name: source.to_string(),
                total_pages,
                chunk_index,
            },
            embedding: None,
        }
    }

    pub fn chunk_id(source: &str, chunk_index: usize) -> String {
        format!("{source}_chunk_{chunk_index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        let chunk = DocumentChunk::new("Solar Brochure", 2, "text".to_string(), 4);
        assert_eq!(chunk.id, "Solar Brochure_chunk_2");
        assert_eq!(chunk.metadata.chunk_index, 2);
        assert_eq!(chunk.metadata.file_name, "Solar Brochure");
    }

    #[test]
    fn test_chunk_serializes_camel_case_metadata() {
        let chunk = DocumentChunk::new("catalog", 0, "Inverters".to_string(), 3);
        let json = serde_json::to_value(&chunk).expect("serialize");

        assert_eq!(json["metadata"]["fileName"], "catalog");
        assert_eq!(json["metadata"]["totalPages"], 3);
        assert_eq!(json["metadata"]["chunkIndex"], 0);
        assert!(json.get("embedding").is_none());
    }

    #[test]
    fn test_chunk_deserializes_without_embedding() {
        let json = r#"{
            "id": "catalog_chunk_0",
            "text": "5kVA hybrid inverter",
            "source": "catalog",
            "metadata": {"fileName": "catalog", "totalPages": 2, "chunkIndex": 0}
        }"#;
        let chunk: DocumentChunk = serde_json::from_str(json).expect("deserialize");
        assert!(chunk.embedding.is_none());
        assert_eq!(chunk.metadata.total_pages, 2);
    }
}
