pub mod error;
pub mod load;
pub mod model;
pub mod onboarding;
pub mod pool;
pub mod refresh;

pub use error::CredentialError;
pub use load::load_credentials;
pub use model::{CredentialRecord, ManagedCredential};
pub use onboarding::OnboardingCoordinator;
pub use pool::{CredentialPool, CredentialState};
pub use refresh::RefreshOutcome;
