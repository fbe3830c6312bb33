use std::time::Duration;

use ccgw_common::GatewayConfig;
use ccgw_credential::{CredentialPool, OnboardingCoordinator, load_credentials};
use ccgw_upstream::{CodeAssistClient, PublicGeminiClient};

use crate::error::GatewayError;

/// Process-wide state shared by every request handler (spec §9 "Global
/// mutable state": the pool is a process-wide singleton; mutation is
/// confined to the rotator and onboarding coordinator).
pub struct AppState {
    pub config: GatewayConfig,
    pub pool: CredentialPool,
    pub onboarding: OnboardingCoordinator,
    pub code_assist: CodeAssistClient,
    pub public_gemini: PublicGeminiClient,
}

impl AppState {
    /// Builds the shared HTTP client, loads the credential pool (env-array
    /// or storage-dir, exactly once), and wires the two upstream clients.
    /// Does not perform any network I/O itself — the optional warm-up pass
    /// (spec §4.1) is a separate, spawned step the caller chooses to run.
    pub fn bootstrap(config: GatewayConfig) -> anyhow::Result<Self> {
        let http_client = wreq::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        let credentials = load_credentials(&config);
        if credentials.is_empty() {
            tracing::warn!(
                "no credentials loaded at startup; every chat/token request will fail with 503 until credential files or CCGW_CREDENTIALS_JSON_LIST are provided"
            );
        }
        let pool = CredentialPool::new(credentials, http_client.clone(), &config);
        let onboarding = OnboardingCoordinator::new(http_client.clone(), config.code_assist_endpoint.clone());
        let code_assist = CodeAssistClient::new(http_client.clone(), config.code_assist_endpoint.clone());
        let public_gemini = PublicGeminiClient::new(
            http_client,
            config.gemini_public_endpoint.clone(),
            config.embedding_api_key.clone(),
        );

        Ok(Self { config, pool, onboarding, code_assist, public_gemini })
    }

    /// Picks a credential from the rotator and makes sure it's onboarded,
    /// returning `(access_token, project_id)` (spec §4.7 "Chat-completion
    /// service" / "Model service"): every Code Assist action needs both.
    pub async fn acquire_credential(&self) -> Result<(String, String), GatewayError> {
        let credential = self.pool.next().await?;
        let credential = self.pool.ensure_onboarded(&credential, &self.onboarding).await?;
        let access_token = credential
            .access_token
            .ok_or(GatewayError::MalformedUpstreamContent("access_token"))?;
        let project_id = credential
            .project_id
            .ok_or(GatewayError::MalformedUpstreamContent("project_id"))?;
        Ok((access_token, project_id))
    }
}
