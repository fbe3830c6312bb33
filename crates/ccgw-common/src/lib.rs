pub mod config;
pub mod platform;

pub use config::{GatewayConfig, GatewayConfigError, GatewayConfigPatch};
pub use platform::{ClientMetadata, Platform, client_metadata, user_agent};
