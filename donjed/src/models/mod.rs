mod chunk;
mod conversation;
mod search;

pub use chunk::*;
pub use conversation::*;
pub use search::*;
