use crate::application::services::session_with_retry::SessionWithRetry;
use crate::application::use_cases::authenticate::{
    AuthenticateInteractor, AuthenticateUseCase, AuthenticateUseCaseInput,
};
use crate::application::use_cases::extract_workflow_runs::{
    ExtractWorkflowRunsInteractor, ExtractWorkflowRunsUseCase, ExtractWorkflowRunsUseCaseInput,
    ExtractionReport, GITHUB_API_URL,
};
use crate::application::use_cases::summarize_workflow_runs::{
    SummarizeWorkflowRunsInteractor, SummarizeWorkflowRunsUseCase,
    SummarizeWorkflowRunsUseCaseInput,
};
use crate::domain::models::archive::SUMMARY_FILE_NAME;
use crate::domain::models::token::StoredToken;
use crate::infrastructures::adapters::secondary::external_apis::github::{
    DEFAULT_PER_PAGE, GitHubApiAdapter, GitHubDeviceFlowAdapter,
};
use crate::infrastructures::adapters::secondary::storage::archive::FsArchiveWriter;
use crate::infrastructures::adapters::secondary::storage::csv_report::write_records_to_path;
use crate::infrastructures::adapters::secondary::storage::env_file::{
    EnvFileTokenStore, TOKEN_EXPIRY_KEY, TOKEN_KEY,
};
use crate::infrastructures::adapters::secondary::system::{SystemClock, TerminalPrompt};
use crate::infrastructures::config::{Config, Settings};
use anyhow::{Context, Error};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Archive GitHub Actions workflow runs of an organization and summarize them as CSV.
#[derive(Debug, Parser)]
#[command(name = "gha-run-archive", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Organization whose repositories are extracted.
    #[arg(long = "org", env = "GITHUB_ORG", global = true)]
    pub organization: Option<String>,

    /// Root of the on-disk archive.
    #[arg(long, env = "GITHUB_WORKFLOW_RUNS_DIR", default_value = "workflow_runs", global = true)]
    pub output_dir: PathBuf,

    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_URL, global = true)]
    pub api_url: String,

    /// `KEY=value` file holding the access token.
    #[arg(long, env = "GITHUB_WORKFLOW_RUNS_ENV_FILE", default_value = ".env", global = true)]
    pub env_file: PathBuf,

    #[arg(long, env = "GITHUB_WORKFLOW_RUNS_MAX_RETRIES", default_value_t = 3, global = true)]
    pub max_retries: u32,

    /// Delay before the first retry; doubled on every further retry.
    #[arg(long, env = "GITHUB_WORKFLOW_RUNS_BASE_DELAY_MS", default_value_t = 500, global = true)]
    pub base_delay_ms: u64,

    #[arg(long, default_value_t = DEFAULT_PER_PAGE, global = true)]
    pub per_page: u32,
}

/// The `--env-file` value among raw `args`, found without a full parse so
/// that the file can supply `env` defaults to the parse itself.
pub fn env_file_arg<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.to_str().and_then(|arg| arg.strip_prefix("--env-file=")) {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch every repository's workflow runs into a new snapshot.
    Extract,
    /// Write the newest snapshot of every run to workflow_runs.csv.
    Summarize,
    /// Extract, then summarize.
    Run,
    /// Obtain a fresh token through the device flow and store it.
    Login,
}

impl Cli {
    /// Combines flags with credentials, which are only read from the environment.
    pub fn settings(&self) -> Settings {
        Settings {
            organization: self.organization.clone(),
            output_dir: self.output_dir.clone(),
            api_url: self.api_url.clone(),
            env_file: self.env_file.clone(),
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            per_page: self.per_page,
            token: std::env::var(TOKEN_KEY).ok(),
            token_expiry: std::env::var(TOKEN_EXPIRY_KEY).ok(),
            app_client_id: std::env::var("GITHUB_APP_CLIENT_ID").ok(),
        }
    }

    pub async fn run(self) -> Result<(), Error> {
        match self.command.unwrap_or(Command::Run) {
            Command::Summarize => summarize(&self.output_dir).await,
            Command::Login => {
                let config = Config::try_from(self.settings())?;
                authenticate(&config, true).await.map(|_| ())
            }
            Command::Extract => {
                let config = Config::try_from(self.settings())?;
                extract(&config).await.map(|_| ())
            }
            Command::Run => {
                let config = Config::try_from(self.settings())?;
                extract(&config).await?;
                summarize(&config.output_dir).await
            }
        }
    }
}

async fn authenticate(config: &Config, force: bool) -> Result<StoredToken, Error> {
    let interactor = AuthenticateInteractor::new(
        Arc::new(GitHubDeviceFlowAdapter::default()),
        Arc::new(TerminalPrompt),
        Arc::new(SystemClock),
        Arc::new(EnvFileTokenStore::new(&config.env_file)),
    );
    interactor
        .execute(AuthenticateUseCaseInput {
            cached: config.cached_token.clone(),
            app_client_id: config.app_client_id.clone(),
            force,
        })
        .await
        .context("Failed to obtain a GitHub access token")
}

async fn extract(config: &Config) -> Result<ExtractionReport, Error> {
    let organization = config.organization()?.to_owned();
    let token = authenticate(config, false).await?;

    let session = SessionWithRetry::new(
        GitHubApiAdapter::new(token.access_token, config.per_page),
        SystemClock,
        config.retry,
    );
    let writer = FsArchiveWriter::new(&config.output_dir);
    let interactor = ExtractWorkflowRunsInteractor::new(Arc::new(session), Arc::new(writer));

    interactor
        .execute(ExtractWorkflowRunsUseCaseInput {
            organization,
            api_base_url: config.api_url.clone(),
            started_at: Utc::now(),
        })
        .await
}

async fn summarize(archive_root: &Path) -> Result<(), Error> {
    let records = SummarizeWorkflowRunsInteractor
        .execute(SummarizeWorkflowRunsUseCaseInput {
            archive_root: archive_root.to_path_buf(),
        })
        .await?;

    let path = archive_root.join(SUMMARY_FILE_NAME);
    write_records_to_path(&records, &path)?;
    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gha-run-archive", "summarize", "--output-dir", "out"]).unwrap();

        assert_eq!(cli.command, Some(Command::Summarize));
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.per_page, 100);
    }

    #[test]
    fn test_env_file_arg() {
        assert_eq!(
            env_file_arg(["gha-run-archive", "extract", "--env-file", "ci.env"]),
            Some(PathBuf::from("ci.env"))
        );
        assert_eq!(
            env_file_arg(["gha-run-archive", "--env-file=ci.env", "run"]),
            Some(PathBuf::from("ci.env"))
        );
        assert_eq!(env_file_arg(["gha-run-archive", "summarize"]), None);
        assert_eq!(env_file_arg(["gha-run-archive", "--", "--env-file", "x"]), None);
    }

    #[test]
    fn test_settings_from_env_file_reach_flag_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.env");
        std::fs::write(&path, "GHA_RUN_ARCHIVE_TEST_ORG=from-env-file\n").unwrap();
        let args = ["gha-run-archive", "extract", "--env-file", path.to_str().unwrap()];

        dotenvy::from_path(env_file_arg(args).unwrap()).unwrap();
        let command = <Cli as clap::CommandFactory>::command().mut_arg("organization", |arg| {
            arg.env("GHA_RUN_ARCHIVE_TEST_ORG")
        });
        let matches = command.try_get_matches_from(args).unwrap();
        let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches).unwrap();

        assert_eq!(cli.organization.as_deref(), Some("from-env-file"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gha-run-archive",
            "extract",
            "--org",
            "acme",
            "--max-retries",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Command::Extract));
        assert_eq!(cli.organization.as_deref(), Some("acme"));
        assert_eq!(cli.max_retries, 5);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
