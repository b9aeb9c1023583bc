use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The subset of a workflow run document this crate reads back from the archive.
///
/// Only `id` and `repository.name` are typed; every other column is kept as the
/// text of whatever JSON value the document holds, so an unexpected value type
/// never rejects an otherwise well-formed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub head_sha: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub conclusion: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub run_started_at: Option<String>,
    pub repository: RunRepository,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRepository {
    pub name: String,
}

/// `null` becomes `None`, strings pass through, anything else is rendered as JSON.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

/// Flat projection of a [`WorkflowRun`]; field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub repo: String,
    pub name: Option<String>,
    pub head_sha: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub run_started_at: Option<String>,
}

impl Record {
    pub const FIELDS: [&'static str; 9] = [
        "id",
        "repo",
        "name",
        "head_sha",
        "status",
        "conclusion",
        "created_at",
        "updated_at",
        "run_started_at",
    ];
}

impl From<WorkflowRun> for Record {
    fn from(run: WorkflowRun) -> Self {
        Self {
            id: run.id,
            repo: run.repository.name,
            name: run.name,
            head_sha: run.head_sha,
            status: run.status,
            conclusion: run.conclusion,
            created_at: run.created_at,
            updated_at: run.updated_at,
            run_started_at: run.run_started_at,
        }
    }
}
