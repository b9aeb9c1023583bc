use crate::application::services::session_with_retry::RetryPolicy;
use crate::domain::models::token::StoredToken;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Neither GITHUB_WORKFLOW_RUNS_TOKEN nor GITHUB_APP_CLIENT_ID is set; one of them is required"
    )]
    MissingCredentials,

    #[error("No organization given; pass --org or set GITHUB_ORG")]
    MissingOrganization,

    #[error("GITHUB_WORKFLOW_RUNS_TOKEN_EXPIRY is not an RFC 3339 timestamp: {value}")]
    InvalidTokenExpiry {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Raw settings as they come from flags, environment or the secrets file.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub organization: Option<String>,
    pub output_dir: PathBuf,
    pub api_url: String,
    pub env_file: PathBuf,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub per_page: u32,
    pub token: Option<String>,
    pub token_expiry: Option<String>,
    pub app_client_id: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub organization: Option<String>,
    pub output_dir: PathBuf,
    pub api_url: String,
    pub env_file: PathBuf,
    pub retry: RetryPolicy,
    pub per_page: u32,
    pub cached_token: Option<StoredToken>,
    pub app_client_id: Option<String>,
}

impl Config {
    pub fn organization(&self) -> Result<&str, ConfigError> {
        self.organization
            .as_deref()
            .ok_or(ConfigError::MissingOrganization)
    }
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let token = settings.token.filter(|token| !token.is_empty());
        let app_client_id = settings.app_client_id.filter(|id| !id.is_empty());
        if token.is_none() && app_client_id.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        let expires_at = settings
            .token_expiry
            .filter(|value| !value.is_empty())
            .map(|value| {
                DateTime::parse_from_rfc3339(&value)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|source| ConfigError::InvalidTokenExpiry { value, source })
            })
            .transpose()?;

        Ok(Self {
            organization: settings.organization.filter(|org| !org.is_empty()),
            output_dir: settings.output_dir,
            api_url: settings.api_url.trim_end_matches('/').to_owned(),
            env_file: settings.env_file,
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                base_delay: Duration::from_millis(settings.base_delay_ms),
            },
            per_page: settings.per_page,
            cached_token: token.map(|access_token| StoredToken {
                access_token,
                expires_at,
            }),
            app_client_id,
        })
    }
}
