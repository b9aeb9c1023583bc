use crate::application::services::extractors::{decoded, repo_names, run_file, workflow_runs};
use crate::application::services::pagination::{archived, pages};
use crate::domain::external_apis::github::Session;
use crate::domain::models::archive::{REPOS_DIR, timestamp_label};
use crate::domain::ports::ArchiveWriter;
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use std::path::PathBuf;
use std::sync::Arc;

pub const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct ExtractWorkflowRunsUseCaseInput {
    pub organization: String,
    pub api_base_url: String,
    /// Start of this extraction; every file written is filed under its label.
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub timestamp: String,
    pub repositories: usize,
    pub runs: usize,
}

pub trait ExtractWorkflowRunsUseCase {
    fn execute(
        &self,
        input: ExtractWorkflowRunsUseCaseInput,
    ) -> impl Future<Output = Result<ExtractionReport, Error>>;
}

pub struct ExtractWorkflowRunsInteractor<S: Session, W: ArchiveWriter> {
    session: Arc<S>,
    writer: Arc<W>,
}

impl<S: Session, W: ArchiveWriter> ExtractWorkflowRunsInteractor<S, W> {
    pub fn new(session: Arc<S>, writer: Arc<W>) -> Self {
        Self { session, writer }
    }

    /// Archives every run page of `repo` and each run on it. Returns the run count.
    async fn extract_repository(
        &self,
        input: &ExtractWorkflowRunsUseCaseInput,
        repo: &str,
        dir: PathBuf,
    ) -> Result<usize, Error> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs",
            input.api_base_url, input.organization, repo
        );
        let runs = workflow_runs(decoded(archived(
            pages(self.session.as_ref(), &url),
            self.writer.as_ref(),
            dir.clone(),
        )));
        tokio::pin!(runs);

        let mut count = 0;
        while let Some(run) = runs.try_next().await? {
            self.writer.write(&run_file(&dir, &run)?).await?;
            count += 1;
        }
        Ok(count)
    }
}

impl<S: Session, W: ArchiveWriter> ExtractWorkflowRunsUseCase
    for ExtractWorkflowRunsInteractor<S, W>
{
    #[tracing::instrument(
        name = "ExtractWorkflowRunsInteractor::execute",
        skip(self, input),
        fields(organization = %input.organization)
    )]
    async fn execute(
        &self,
        input: ExtractWorkflowRunsUseCaseInput,
    ) -> Result<ExtractionReport, Error> {
        let timestamp = timestamp_label(input.started_at);
        tracing::info!("Extracting workflow runs into snapshot {}", timestamp);

        let url = format!("{}/orgs/{}/repos", input.api_base_url, input.organization);
        let names = repo_names(decoded(archived(
            pages(self.session.as_ref(), &url),
            self.writer.as_ref(),
            PathBuf::from(REPOS_DIR).join(&timestamp),
        )));
        tokio::pin!(names);

        let mut report = ExtractionReport {
            timestamp: timestamp.clone(),
            ..ExtractionReport::default()
        };
        while let Some(repo) = names.try_next().await? {
            tracing::info!("Fetching workflow runs for {}", repo);
            let dir = PathBuf::from(&repo).join(&timestamp);
            let runs = self
                .extract_repository(&input, &repo, dir)
                .await
                .with_context(|| format!("Failed to extract workflow runs for {repo}"))?;
            tracing::debug!("Archived {} runs of {}", runs, repo);
            report.repositories += 1;
            report.runs += runs;
        }

        tracing::info!(
            "Archived {} runs from {} repositories",
            report.runs,
            report.repositories
        );
        Ok(report)
    }
}
