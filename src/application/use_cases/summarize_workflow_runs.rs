use crate::domain::models::run::{Record, WorkflowRun};
use anyhow::{Context, Error};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct SummarizeWorkflowRunsUseCaseInput {
    pub archive_root: PathBuf,
}

pub trait SummarizeWorkflowRunsUseCase {
    fn execute(
        &self,
        input: SummarizeWorkflowRunsUseCaseInput,
    ) -> impl Future<Output = Result<Vec<Record>, Error>>;
}

/// Reduces the archive to the newest snapshot of every run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeWorkflowRunsInteractor;

impl SummarizeWorkflowRunsUseCase for SummarizeWorkflowRunsInteractor {
    #[tracing::instrument(name = "SummarizeWorkflowRunsInteractor::execute", skip(self))]
    async fn execute(&self, input: SummarizeWorkflowRunsUseCaseInput) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();

        for repo in extracted_repo_names(&input.archive_root).await? {
            let paths = extracted_run_paths(&input.archive_root, &repo).await?;
            let latest = latest_run_paths(paths);
            tracing::debug!("{} distinct runs archived for {}", latest.len(), repo);
            for path in latest {
                records.push(load_record(&path).await?);
            }
        }

        tracing::info!("Summarized {} workflow runs", records.len());
        Ok(records)
    }
}

/// Names of the directories directly under `root`, sorted.
pub async fn extracted_repo_names(root: &Path) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for path in sorted_children(root).await? {
        if fs::metadata(&path).await?.is_dir()
            && let Some(name) = path.file_name()
        {
            names.push(name.to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Every `<root>/<repo>/*/runs/*.json`, in descending path order.
///
/// Newer snapshot directories sort first because their labels sort later.
pub async fn extracted_run_paths(root: &Path, repo: &str) -> Result<Vec<PathBuf>, Error> {
    let mut paths = Vec::new();
    for snapshot in sorted_children(&root.join(repo)).await? {
        let runs_dir = snapshot.join("runs");
        if !fs::try_exists(&runs_dir).await? || !fs::metadata(&runs_dir).await?.is_dir() {
            continue;
        }
        for path in sorted_children(&runs_dir).await? {
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
    }
    paths.sort_unstable_by(|a, b| b.cmp(a));
    Ok(paths)
}

/// Keeps the first path seen for each file name, dropping later (older) duplicates.
pub fn latest_run_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: HashSet<OsString> = HashSet::new();
    paths
        .into_iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| seen.insert(name.to_os_string()))
        })
        .collect()
}

pub async fn load_record(path: &Path) -> Result<Record, Error> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let run: WorkflowRun = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse workflow run {}", path.display()))?;
    Ok(Record::from(run))
}

async fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs as std_fs;

    fn write_run(root: &Path, repo: &str, timestamp: &str, id: u64, status: &str) -> PathBuf {
        let dir = root.join(repo).join(timestamp).join("runs");
        std_fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{id}.json"));
        let run = json!({
            "id": id,
            "name": "My Workflow",
            "head_sha": "12345678",
            "status": status,
            "conclusion": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "run_started_at": "2025-01-01T00:00:00Z",
            "repository": { "name": repo }
        });
        std_fs::write(&path, run.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_get_names_of_extracted_repos() {
        let root = tempfile::tempdir().unwrap();
        std_fs::create_dir_all(root.path().join("repo_2")).unwrap();
        std_fs::create_dir_all(root.path().join("repo_1")).unwrap();
        std_fs::write(root.path().join("workflow_runs.csv"), "id\n").unwrap();

        let names = extracted_repo_names(root.path()).await.unwrap();

        assert_eq!(names, vec!["repo_1", "repo_2"]);
    }

    #[tokio::test]
    async fn test_get_all_extracted_run_filepaths() {
        let root = tempfile::tempdir().unwrap();
        let root = root.path();
        for timestamp in ["20250101-000000Z", "20250102-000000Z"] {
            write_run(root, "repo_1", timestamp, 1, "completed");
            write_run(root, "repo_1", timestamp, 2, "completed");
        }
        std_fs::create_dir_all(root.join("repo_1/20250103-000000Z/pages")).unwrap();

        let paths = extracted_run_paths(root, "repo_1").await.unwrap();

        let runs = |ts: &str, id: &str| root.join("repo_1").join(ts).join("runs").join(id);
        assert_eq!(
            paths,
            vec![
                runs("20250102-000000Z", "2.json"),
                runs("20250102-000000Z", "1.json"),
                runs("20250101-000000Z", "2.json"),
                runs("20250101-000000Z", "1.json"),
            ]
        );
    }

    #[test]
    fn test_latest_run_paths_keeps_first_occurrence() {
        let paths = vec![
            PathBuf::from("r/20250102-000000Z/runs/2.json"),
            PathBuf::from("r/20250102-000000Z/runs/1.json"),
            PathBuf::from("r/20250101-000000Z/runs/3.json"),
            PathBuf::from("r/20250101-000000Z/runs/2.json"),
        ];

        assert_eq!(
            latest_run_paths(paths),
            vec![
                PathBuf::from("r/20250102-000000Z/runs/2.json"),
                PathBuf::from("r/20250102-000000Z/runs/1.json"),
                PathBuf::from("r/20250101-000000Z/runs/3.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_newest_snapshot_wins() {
        let root = tempfile::tempdir().unwrap();
        write_run(root.path(), "repo_1", "20250101-000000Z", 7, "in_progress");
        write_run(root.path(), "repo_1", "20250102-000000Z", 7, "completed");
        write_run(root.path(), "repo_1", "20250101-000000Z", 8, "queued");
        let input = SummarizeWorkflowRunsUseCaseInput {
            archive_root: root.path().to_path_buf(),
        };

        let records = SummarizeWorkflowRunsInteractor.execute(input).await.unwrap();

        let statuses: Vec<(u64, Option<&str>)> = records
            .iter()
            .map(|record| (record.id, record.status.as_deref()))
            .collect();
        assert_eq!(statuses, vec![(7, Some("completed")), (8, Some("queued"))]);
    }

    #[tokio::test]
    async fn test_summarize_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        write_run(root.path(), "repo_1", "20250101-000000Z", 1, "completed");
        write_run(root.path(), "repo_2", "20250101-000000Z", 2, "completed");
        std_fs::create_dir_all(root.path().join("repos/20250101-000000Z/pages")).unwrap();
        let input = SummarizeWorkflowRunsUseCaseInput {
            archive_root: root.path().to_path_buf(),
        };

        let first = SummarizeWorkflowRunsInteractor.execute(input.clone()).await.unwrap();
        let second = SummarizeWorkflowRunsInteractor.execute(input).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_summarize_run_with_numeric_head_sha() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("repo_1/20250101-000000Z/runs");
        std_fs::create_dir_all(&dir).unwrap();
        let run = json!({
            "id": 1,
            "name": "My Workflow",
            "head_sha": 12345678,
            "status": "pending",
            "conclusion": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "run_started_at": "2025-01-01T00:00:00Z",
            "repository": { "name": "repo_1" }
        });
        std_fs::write(dir.join("1.json"), run.to_string()).unwrap();
        let input = SummarizeWorkflowRunsUseCaseInput {
            archive_root: root.path().to_path_buf(),
        };

        let records = SummarizeWorkflowRunsInteractor.execute(input).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repo, "repo_1");
        assert_eq!(records[0].head_sha.as_deref(), Some("12345678"));
        assert_eq!(records[0].created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_malformed_run_aborts_summary() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("repo_1/20250101-000000Z/runs");
        std_fs::create_dir_all(&dir).unwrap();
        std_fs::write(dir.join("1.json"), "{not json").unwrap();
        let input = SummarizeWorkflowRunsUseCaseInput {
            archive_root: root.path().to_path_buf(),
        };

        assert!(SummarizeWorkflowRunsInteractor.execute(input).await.is_err());
    }
}
