#[derive(Debug, thiserror::Error)]
pub enum GatewayConfigError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Final, merged configuration used by the running process.
///
/// Merge order: CLI > ENV > struct defaults. There is no database layer to
/// merge against (unlike the multi-provider teacher this crate is modeled
/// on) — credential storage is read-only at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub domain_name: String,
    pub upstream_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
    pub code_assist_endpoint: String,
    pub gemini_public_endpoint: String,
    pub oauth_token_endpoint: String,
    pub auth_password: String,
    pub embedding_api_key: String,
    pub credentials_storage_dir: String,
    pub credentials_json: Option<String>,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub unsupported_tool_schema_keys: Vec<String>,
    pub debug: bool,
    pub debug_redact_logs: bool,
}

/// Google's public `gemini-cli` desktop OAuth client. Not a secret in the
/// usual sense — it identifies the client application, not a user or
/// account — and is the same literal the upstream CLI ships.
pub const DEFAULT_OAUTH_CLIENT_ID: &str =
    "681255809395-oo8ft2oprdrnp9e3aqf6av3hmdib135j.apps.googleusercontent.com";
pub const DEFAULT_OAUTH_CLIENT_SECRET: &str = "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";

/// Optional overlay layer used while merging CLI args and environment
/// variables, mirroring the teacher's `GlobalConfigPatch` so a future
/// persisted layer can be overlaid the same way without reshaping the type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub domain_name: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub code_assist_endpoint: Option<String>,
    pub gemini_public_endpoint: Option<String>,
    pub oauth_token_endpoint: Option<String>,
    pub auth_password: Option<String>,
    pub embedding_api_key: Option<String>,
    pub credentials_storage_dir: Option<String>,
    pub credentials_json: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub unsupported_tool_schema_keys: Option<Vec<String>>,
    pub debug: Option<bool>,
    pub debug_redact_logs: Option<bool>,
}

impl GatewayConfigPatch {
    /// Applies `other` on top of `self`; fields set in `other` win.
    pub fn overlay(&mut self, other: GatewayConfigPatch) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(host);
        take!(port);
        take!(domain_name);
        take!(upstream_timeout_secs);
        take!(cors_allowed_origins);
        take!(code_assist_endpoint);
        take!(gemini_public_endpoint);
        take!(oauth_token_endpoint);
        take!(auth_password);
        take!(embedding_api_key);
        take!(credentials_storage_dir);
        take!(credentials_json);
        take!(oauth_client_id);
        take!(oauth_client_secret);
        take!(unsupported_tool_schema_keys);
        take!(debug);
        take!(debug_redact_logs);
    }

    pub fn into_config(self) -> Result<GatewayConfig, GatewayConfigError> {
        Ok(GatewayConfig {
            host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.unwrap_or(7860),
            domain_name: self
                .domain_name
                .unwrap_or_else(|| "http://localhost:7860".to_string()),
            upstream_timeout_secs: self.upstream_timeout_secs.unwrap_or(300),
            cors_allowed_origins: self
                .cors_allowed_origins
                .unwrap_or_else(|| vec!["*".to_string()]),
            code_assist_endpoint: self
                .code_assist_endpoint
                .unwrap_or_else(|| "https://cloudcode-pa.googleapis.com".to_string()),
            gemini_public_endpoint: self
                .gemini_public_endpoint
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            oauth_token_endpoint: self
                .oauth_token_endpoint
                .unwrap_or_else(|| "https://oauth2.googleapis.com/token".to_string()),
            auth_password: self.auth_password.unwrap_or_else(|| "123456".to_string()),
            embedding_api_key: self.embedding_api_key.unwrap_or_default(),
            credentials_storage_dir: self
                .credentials_storage_dir
                .unwrap_or_else(|| "./credentials".to_string()),
            credentials_json: self.credentials_json,
            oauth_client_id: self
                .oauth_client_id
                .unwrap_or_else(|| DEFAULT_OAUTH_CLIENT_ID.to_string()),
            oauth_client_secret: self
                .oauth_client_secret
                .unwrap_or_else(|| DEFAULT_OAUTH_CLIENT_SECRET.to_string()),
            unsupported_tool_schema_keys: self.unsupported_tool_schema_keys.unwrap_or_else(|| {
                vec!["$schema".to_string(), "exclusiveMinimum".to_string()]
            }),
            debug: self.debug.unwrap_or(false),
            debug_redact_logs: self.debug_redact_logs.unwrap_or(true),
        })
    }
}

impl From<GatewayConfig> for GatewayConfigPatch {
    fn from(value: GatewayConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            domain_name: Some(value.domain_name),
            upstream_timeout_secs: Some(value.upstream_timeout_secs),
            cors_allowed_origins: Some(value.cors_allowed_origins),
            code_assist_endpoint: Some(value.code_assist_endpoint),
            gemini_public_endpoint: Some(value.gemini_public_endpoint),
            oauth_token_endpoint: Some(value.oauth_token_endpoint),
            auth_password: Some(value.auth_password),
            embedding_api_key: Some(value.embedding_api_key),
            credentials_storage_dir: Some(value.credentials_storage_dir),
            credentials_json: value.credentials_json,
            oauth_client_id: Some(value.oauth_client_id),
            oauth_client_secret: Some(value.oauth_client_secret),
            unsupported_tool_schema_keys: Some(value.unsupported_tool_schema_keys),
            debug: Some(value.debug),
            debug_redact_logs: Some(value.debug_redact_logs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let config = GatewayConfigPatch::default().into_config().unwrap();
        assert_eq!(config.port, 7860);
        assert_eq!(config.cors_allowed_origins, vec!["*".to_string()]);
        assert_eq!(
            config.unsupported_tool_schema_keys,
            vec!["$schema".to_string(), "exclusiveMinimum".to_string()]
        );
    }

    #[test]
    fn overlay_prefers_later_values() {
        let mut base = GatewayConfigPatch {
            port: Some(1234),
            ..Default::default()
        };
        base.overlay(GatewayConfigPatch {
            port: Some(9999),
            host: Some("127.0.0.1".to_string()),
            ..Default::default()
        });
        assert_eq!(base.port, Some(9999));
        assert_eq!(base.host, Some("127.0.0.1".to_string()));
    }
}
