use ccgw_common::user_agent;
use serde::{Deserialize, Serialize};

use crate::model::ManagedCredential;

/// What a refresh attempt produced. The rotator uses this to decide whether
/// the credential should be permanently invalidated or merely skipped for
/// this pass (spec §4.1 step 5).
#[derive(Debug)]
pub enum RefreshOutcome {
    Refreshed { access_token: String, expires_at: i64 },
    Permanent(String),
    Transient(String),
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Performs the refresh-token grant against the configured token endpoint.
///
/// A non-2xx response is classified by status: 4xx mirrors the upstream
/// telling us the grant itself is dead (`invalid_grant`, revoked consent) so
/// it is treated as permanent; anything else (network failure, 5xx) is
/// transient and the rotator simply tries the next credential.
pub async fn refresh_access_token(
    client: &wreq::Client,
    token_endpoint: &str,
    default_client_id: &str,
    default_client_secret: &str,
    credential: &ManagedCredential,
    now: i64,
) -> RefreshOutcome {
    let client_id = credential.client_id.as_deref().unwrap_or(default_client_id);
    let client_secret = credential
        .client_secret
        .as_deref()
        .unwrap_or(default_client_secret);

    let request = RefreshRequest {
        client_id,
        client_secret,
        grant_type: "refresh_token",
        refresh_token: &credential.refresh_token,
    };

    let response = match client
        .post(token_endpoint)
        .header("user-agent", user_agent())
        .form(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return RefreshOutcome::Transient(err.to_string()),
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = format!("refresh_token failed: {status}: {body}");
        return if status.is_client_error() {
            RefreshOutcome::Permanent(message)
        } else {
            RefreshOutcome::Transient(message)
        };
    }

    let payload: RefreshResponse = match response.json().await {
        Ok(payload) => payload,
        Err(err) => return RefreshOutcome::Transient(err.to_string()),
    };

    let Some(access_token) = payload.access_token else {
        return RefreshOutcome::Transient("refresh response missing access_token".to_string());
    };
    let expires_at = now + payload.expires_in.unwrap_or(3600);
    RefreshOutcome::Refreshed { access_token, expires_at }
}
