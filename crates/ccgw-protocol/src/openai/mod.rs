pub mod create_chat_completions;
pub mod create_embeddings;

pub use create_chat_completions::*;
pub use create_embeddings::*;
