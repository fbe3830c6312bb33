use ccgw_common::GatewayConfigPatch;
use clap::Parser;

/// Command-line flags, mirroring `GatewayConfigPatch` one field at a time.
/// Every flag is optional so the CLI layer only overrides what the caller
/// actually sets; environment variables and struct defaults fill the rest.
#[derive(Parser, Debug)]
#[command(name = "ccgw", about = "Multi-protocol API gateway fronting Google's Cloud Code Assist Gemini endpoint")]
pub(crate) struct Cli {
    #[arg(long)]
    pub(crate) host: Option<String>,
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[arg(long)]
    pub(crate) domain_name: Option<String>,
    #[arg(long)]
    pub(crate) upstream_timeout_secs: Option<u64>,
    /// Repeatable: `--cors-origin https://a --cors-origin https://b`.
    #[arg(long = "cors-origin")]
    pub(crate) cors_allowed_origins: Vec<String>,
    #[arg(long)]
    pub(crate) auth_password: Option<String>,
    #[arg(long)]
    pub(crate) embedding_api_key: Option<String>,
    #[arg(long)]
    pub(crate) credentials_storage_dir: Option<String>,
    #[arg(long)]
    pub(crate) oauth_client_id: Option<String>,
    #[arg(long)]
    pub(crate) oauth_client_secret: Option<String>,
    #[arg(long)]
    pub(crate) debug: bool,
}

impl Cli {
    pub(crate) fn into_patch(self) -> GatewayConfigPatch {
        GatewayConfigPatch {
            host: self.host,
            port: self.port,
            domain_name: self.domain_name,
            upstream_timeout_secs: self.upstream_timeout_secs,
            cors_allowed_origins: (!self.cors_allowed_origins.is_empty())
                .then_some(self.cors_allowed_origins),
            auth_password: self.auth_password,
            embedding_api_key: self.embedding_api_key,
            credentials_storage_dir: self.credentials_storage_dir,
            oauth_client_id: self.oauth_client_id,
            oauth_client_secret: self.oauth_client_secret,
            debug: self.debug.then_some(true),
            ..Default::default()
        }
    }
}

/// Reads the subset of `GatewayConfigPatch` fields that have a documented
/// environment variable (spec §4.8 "Configuration"). CLI flags, applied by
/// the caller via `overlay`, take precedence over these.
pub(crate) fn patch_from_env() -> GatewayConfigPatch {
    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.is_empty())
    }
    fn var_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
        var(name).and_then(|value| value.parse().ok())
    }
    fn var_bool(name: &str) -> Option<bool> {
        var(name).map(|value| matches!(value.as_str(), "1" | "true" | "yes" | "on"))
    }
    fn var_list(name: &str) -> Option<Vec<String>> {
        var(name).map(|value| value.split(',').map(|part| part.trim().to_string()).collect())
    }

    GatewayConfigPatch {
        host: var("CCGW_HOST"),
        port: var_parsed("CCGW_PORT"),
        domain_name: var("CCGW_DOMAIN_NAME"),
        upstream_timeout_secs: var_parsed("CCGW_UPSTREAM_TIMEOUT_SECS"),
        cors_allowed_origins: var_list("CCGW_CORS_ALLOWED_ORIGINS"),
        code_assist_endpoint: var("CCGW_CODE_ASSIST_ENDPOINT"),
        gemini_public_endpoint: var("CCGW_GEMINI_PUBLIC_ENDPOINT"),
        oauth_token_endpoint: var("CCGW_OAUTH_TOKEN_ENDPOINT"),
        auth_password: var("CCGW_AUTH_PASSWORD"),
        embedding_api_key: var("CCGW_EMBEDDING_API_KEY"),
        credentials_storage_dir: var("CCGW_CREDENTIALS_STORAGE_DIR"),
        credentials_json: var("CCGW_CREDENTIALS_JSON_LIST"),
        oauth_client_id: var("CCGW_OAUTH_CLIENT_ID"),
        oauth_client_secret: var("CCGW_OAUTH_CLIENT_SECRET"),
        unsupported_tool_schema_keys: var_list("CCGW_UNSUPPORTED_TOOL_SCHEMA_KEYS"),
        debug: var_bool("CCGW_DEBUG"),
        debug_redact_logs: var_bool("CCGW_DEBUG_REDACT_LOGS"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cors_flags_leave_the_patch_field_unset() {
        let cli = Cli {
            host: None,
            port: None,
            domain_name: None,
            upstream_timeout_secs: None,
            cors_allowed_origins: Vec::new(),
            auth_password: None,
            embedding_api_key: None,
            credentials_storage_dir: None,
            oauth_client_id: None,
            oauth_client_secret: None,
            debug: false,
        };
        assert!(cli.into_patch().cors_allowed_origins.is_none());
    }
}
