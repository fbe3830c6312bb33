pub mod auth;
pub mod error;
pub mod logging;
pub mod redact;
pub mod routes;
pub mod services;
pub mod state;
pub mod stream_processor;

pub use error::GatewayError;
pub use routes::build_router;
pub use state::AppState;
