use crate::domain::models::archive::ArchiveEntry;
use crate::domain::models::page::Page;
use anyhow::{Context, Error, anyhow};
use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::path::Path;

/// Decodes each page body as JSON.
pub fn decoded<St>(pages: St) -> impl Stream<Item = Result<Value, Error>>
where
    St: Stream<Item = Result<Page, Error>>,
{
    pages.map(|page| {
        let page = page?;
        page.json()
            .with_context(|| format!("Failed to decode page {}", page.url))
    })
}

/// Yields the `name` of every repository object, page by page.
pub fn repo_names<St>(pages: St) -> impl Stream<Item = Result<String, Error>>
where
    St: Stream<Item = Result<Value, Error>>,
{
    try_stream! {
        for await page in pages {
            let page = page?;
            let repos = page
                .as_array()
                .ok_or_else(|| anyhow!("Repository page is not an array"))?;
            for repo in repos {
                let name = repo["name"]
                    .as_str()
                    .ok_or_else(|| anyhow!("Repository without a name: {repo}"))?;
                yield name.to_owned();
            }
        }
    }
}

/// Yields every element of each page's `workflow_runs` array, page by page.
pub fn workflow_runs<St>(pages: St) -> impl Stream<Item = Result<Value, Error>>
where
    St: Stream<Item = Result<Value, Error>>,
{
    try_stream! {
        for await page in pages {
            let mut page = page?;
            let runs = page
                .get_mut("workflow_runs")
                .map(Value::take)
                .and_then(|runs| match runs {
                    Value::Array(runs) => Some(runs),
                    _ => None,
                })
                .ok_or_else(|| anyhow!("Workflow runs page has no workflow_runs array"))?;
            for run in runs {
                yield run;
            }
        }
    }
}

/// Archive entry for one run document at `dir/runs/<id>.json`.
pub fn run_file(dir: &Path, run: &Value) -> Result<ArchiveEntry, Error> {
    let id = run["id"]
        .as_u64()
        .ok_or_else(|| anyhow!("Workflow run without an integer id: {run}"))?;
    let content = serde_json::to_string(run)?;
    Ok(ArchiveEntry::new(
        dir.join("runs").join(format!("{id}.json")),
        content,
    ))
}
