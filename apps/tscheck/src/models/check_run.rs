//! Wire shapes for the check-runs REST endpoints.

use super::{Annotation, CheckOutput, Conclusion};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Subset of a check run returned by the list endpoint.
pub struct CheckRunSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckRunList {
    #[serde(default)]
    pub check_runs: Vec<CheckRunSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Body of `POST /repos/{owner}/{repo}/check-runs`.
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: &'static str,
    pub started_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Body of `PATCH /repos/{owner}/{repo}/check-runs/{id}`.
///
/// A terminal update carries `completed_at` and `conclusion`; an
/// intermediate update only appends an annotation batch.
pub struct CheckRunUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckOutput>,
}

impl CheckRunUpdate {
    /// Terminal update; `output` is `None` on the error path.
    pub fn complete(
        completed_at: String,
        conclusion: Conclusion,
        output: Option<CheckOutput>,
    ) -> Self {
        CheckRunUpdate {
            completed_at: Some(completed_at),
            conclusion: Some(conclusion),
            output,
        }
    }

    /// Non-terminal update appending one batch of annotations.
    pub fn annotations(title: &str, summary: &str, batch: Vec<Annotation>) -> Self {
        CheckRunUpdate {
            completed_at: None,
            conclusion: None,
            output: Some(CheckOutput {
                title: title.to_string(),
                summary: summary.to_string(),
                annotations: batch,
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.completed_at.is_some() && self.conclusion.is_some()
    }
}
