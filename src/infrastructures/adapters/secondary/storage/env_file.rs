use crate::domain::models::token::StoredToken;
use crate::domain::ports::TokenStore;
use anyhow::{Context, Error};
use async_trait::async_trait;
use chrono::SecondsFormat;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

pub const TOKEN_KEY: &str = "GITHUB_WORKFLOW_RUNS_TOKEN";
pub const TOKEN_EXPIRY_KEY: &str = "GITHUB_WORKFLOW_RUNS_TOKEN_EXPIRY";

/// Drops every `key=` line of a `KEY=value` file and, if given, appends `key=value`.
pub fn replace_value(contents: &str, key: &str, value: Option<&str>) -> String {
    let prefix = format!("{key}=");
    let mut lines: Vec<String> = contents
        .lines()
        .filter(|line| !line.trim_start().starts_with(&prefix))
        .map(str::to_owned)
        .collect();
    if let Some(value) = value {
        lines.push(format!("{key}={value}"));
    }

    let mut replaced = lines.join("\n");
    if !replaced.is_empty() {
        replaced.push('\n');
    }
    replaced
}

/// Persists tokens to a flat `KEY=value` secrets file such as `.env`.
#[derive(Debug, Clone)]
pub struct EnvFileTokenStore {
    path: PathBuf,
}

impl EnvFileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<String, Error> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }
}

#[async_trait]
impl TokenStore for EnvFileTokenStore {
    async fn save(&self, token: &StoredToken) -> Result<(), Error> {
        let expiry = token
            .expires_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));

        let contents = self.read().await?;
        let contents = replace_value(&contents, TOKEN_KEY, Some(&token.access_token));
        let contents = replace_value(&contents, TOKEN_EXPIRY_KEY, expiry.as_deref());

        fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("Saved access token to {}", self.path.display());
        Ok(())
    }
}
