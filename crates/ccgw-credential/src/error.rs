/// Error taxonomy for the credential pool and onboarding coordinator (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No valid credentials available in the rotation pool")]
    NoCredentialsAvailable,

    #[error("refresh failed: {0}")]
    RefreshFailure(String),

    #[error("onboarding request failed: {0}")]
    OnboardingFailed(String),

    #[error("onboarding LRO did not complete after {attempts} attempts")]
    OnboardingIncomplete { attempts: u32 },

    #[error("upstream response missing {0}")]
    MalformedUpstreamContent(&'static str),

    #[error("upstream transport error: {0}")]
    Transport(String),
}
