pub mod client;
pub mod error;

pub use client::{CodeAssistClient, PublicGeminiClient};
pub use error::UpstreamError;
