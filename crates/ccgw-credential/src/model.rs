use serde::{Deserialize, Serialize};

/// One entry in the pool (spec §3 "Managed Credential").
///
/// Constructed from a JSON record at startup; mutated only by the rotator
/// (refresh) and the onboarding coordinator (project ID, onboarded flag).
/// `id` is the entry's fixed position in the pool for the life of the
/// process — used to key the per-credential onboarding lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedCredential {
    #[serde(skip)]
    pub id: usize,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Unix timestamp the access token expires at.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub is_onboarded: bool,
    #[serde(skip, default = "default_valid")]
    pub is_valid: bool,
    /// Where this entry was loaded from (`"env"` or the file path) — purely
    /// diagnostic, included in log lines so an operator can tell which
    /// credential file to look at; never consulted by routing logic.
    #[serde(skip)]
    pub source: String,
}

fn default_valid() -> bool {
    true
}

/// google-auth applies a clock-skew cushion so a token about to expire is
/// treated as already expired; we mirror that rather than refreshing on the
/// exact second.
const CLOCK_SKEW_SECS: i64 = 10;

impl ManagedCredential {
    /// A raw JSON record is only accepted if it carries a refresh token;
    /// everything else is optional (spec §4.1).
    pub fn from_record(id: usize, record: CredentialRecord) -> Option<Self> {
        Self::from_record_with_source(id, record, String::new())
    }

    pub fn from_record_with_source(id: usize, record: CredentialRecord, source: String) -> Option<Self> {
        if record.refresh_token.is_empty() {
            return None;
        }
        Some(Self {
            id,
            refresh_token: record.refresh_token,
            access_token: record.access_token,
            expires_at: record.expires_at,
            project_id: record.project_id,
            user_email: record.user_email,
            client_id: record.client_id,
            client_secret: record.client_secret,
            is_onboarded: false,
            is_valid: true,
            source,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => now + CLOCK_SKEW_SECS >= expires_at,
            _ => true,
        }
    }
}

/// The on-disk / env-array shape of a single credential record. Distinct
/// from `ManagedCredential` so a record missing `refresh_token` can be
/// rejected before the pool entry is built.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_with_no_access_token_is_expired() {
        let cred = ManagedCredential::from_record(
            0,
            CredentialRecord {
                refresh_token: "rt".to_string(),
                access_token: None,
                expires_at: None,
                project_id: None,
                user_email: None,
                client_id: None,
                client_secret: None,
            },
        )
        .unwrap();
        assert!(cred.is_expired(1_000));
    }

    #[test]
    fn credential_within_skew_window_counts_as_expired() {
        let cred = ManagedCredential {
            id: 0,
            refresh_token: "rt".to_string(),
            access_token: Some("at".to_string()),
            expires_at: Some(1_005),
            project_id: None,
            user_email: None,
            client_id: None,
            client_secret: None,
            is_onboarded: false,
            is_valid: true,
            source: String::new(),
        };
        assert!(cred.is_expired(1_000));
        assert!(!cred.is_expired(900));
    }

    #[test]
    fn record_without_refresh_token_is_rejected() {
        let record = CredentialRecord {
            refresh_token: String::new(),
            access_token: None,
            expires_at: None,
            project_id: None,
            user_email: None,
            client_id: None,
            client_secret: None,
        };
        assert!(ManagedCredential::from_record(0, record).is_none());
    }
}
