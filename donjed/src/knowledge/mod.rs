mod store;

pub use store::KnowledgeBase;
