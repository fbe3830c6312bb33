pub mod create_message;

pub use create_message::*;
