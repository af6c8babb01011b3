mod chunker;
mod indexer;

pub use chunker::{chunk_text, TextChunker};
pub use indexer::index_directory;
