use std::path::Path;

use ccgw_common::GatewayConfig;

use crate::model::{CredentialRecord, ManagedCredential};

/// Loads the pool from exactly one source, in priority order (spec §4.1):
/// the env-provided JSON array, else every `oauth_creds_*.json` file in the
/// storage directory. Records missing a refresh token are skipped with a
/// warning rather than failing the whole load.
pub fn load_credentials(config: &GatewayConfig) -> Vec<ManagedCredential> {
    if let Some(credentials) = load_from_env(config.credentials_json.as_deref()) {
        return credentials;
    }
    load_from_files(&config.credentials_storage_dir)
}

fn load_from_env(credentials_json: Option<&str>) -> Option<Vec<ManagedCredential>> {
    let raw = credentials_json?;
    let records: Vec<CredentialRecord> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(err) => {
            tracing::error!(error = %err, "failed to parse credentials JSON array");
            return None;
        }
    };
    let sourced = records.into_iter().map(|record| ("env".to_string(), record)).collect();
    Some(build_pool(sourced))
}

fn load_from_files(storage_dir: &str) -> Vec<ManagedCredential> {
    let dir = Path::new(storage_dir);
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %storage_dir, error = %err, "could not read credentials storage directory");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_oauth_creds_file(path))
        .collect();
    paths.sort();

    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<CredentialRecord>(&contents) {
                Ok(record) => records.push((path.display().to_string(), record)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not parse credential file")
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read credential file")
            }
        }
    }
    build_pool(records)
}

fn is_oauth_creds_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("oauth_creds_") && name.ends_with(".json"))
}

fn build_pool(records: Vec<(String, CredentialRecord)>) -> Vec<ManagedCredential> {
    let mut pool = Vec::new();
    for (source, record) in records {
        if record.refresh_token.is_empty() {
            tracing::warn!(source, "skipping a credential record due to missing refresh_token");
            continue;
        }
        if let Some(credential) = ManagedCredential::from_record_with_source(pool.len(), record, source) {
            pool.push(credential);
        }
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_array_takes_priority_and_skips_missing_refresh_token() {
        let json = r#"[{"refresh_token":"rt1"},{"project_id":"p"}]"#;
        let credentials = load_from_env(Some(json)).unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].refresh_token, "rt1");
        assert_eq!(credentials[0].id, 0);
        assert_eq!(credentials[0].source, "env");
    }

    #[test]
    fn malformed_env_json_falls_back_to_none() {
        assert!(load_from_env(Some("not json")).is_none());
    }
}
