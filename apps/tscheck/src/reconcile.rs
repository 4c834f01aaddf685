//! Check-run reconciliation.
//!
//! Lifecycle per publish: `NoRun` -> `InProgress` -> `Completed`. The
//! states are types: `start` attaches to or creates a run and returns an
//! `InProgressRun`; `InProgressRun::complete` consumes it and returns a
//! `CompletedRun`. A run that reaches `InProgress` receives exactly one
//! terminal update, including when it is dropped during unwinding.
//!
//! De-duplication is a best-effort lookup-then-create. Two concurrent
//! invocations may both create a run; there is no cross-process locking.

use crate::error::Result;
use crate::github::ChecksApi;
use crate::models::check_run::{CheckRunUpdate, NewCheckRun};
use crate::models::{Conclusion, Verdict};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

/// The check-runs API rejects more annotations than this per request.
pub const ANNOTATIONS_PER_REQUEST: usize = 50;

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Find an in-progress run named like `job_name` on `head_sha`, or create a
/// fresh `check_name` run there.
///
/// Matching is case-insensitive and exact. Without a hint no listing call
/// is made.
pub fn start<'a>(
    api: &'a dyn ChecksApi,
    check_name: &str,
    job_name: Option<&str>,
    head_sha: &str,
) -> Result<InProgressRun<'a>> {
    if let Some(hint) = job_name.filter(|h| !h.is_empty()) {
        let wanted = hint.to_lowercase();
        let runs = api.list_in_progress(head_sha)?;
        if let Some(run) = runs.iter().find(|r| r.name.to_lowercase() == wanted) {
            info!(
                id = run.id,
                name = %run.name,
                status = run.status.as_deref().unwrap_or("unknown"),
                "attaching to in-progress check run"
            );
            return Ok(InProgressRun::new(api, run.id, check_name));
        }
        debug!(hint, "no in-progress check run matches job name");
    }
    let id = api.create_check_run(&NewCheckRun {
        name: check_name.to_string(),
        head_sha: head_sha.to_string(),
        status: "in_progress",
        started_at: timestamp(),
    })?;
    info!(id, "created check run");
    Ok(InProgressRun::new(api, id, check_name))
}

/// A check run this invocation owns until it is completed.
pub struct InProgressRun<'a> {
    api: &'a dyn ChecksApi,
    id: u64,
    check_name: String,
    completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal state of one publish.
pub struct CompletedRun {
    pub id: u64,
    pub conclusion: Conclusion,
    /// Reason to surface as the tool's failure, if any.
    pub failure: Option<String>,
}

impl<'a> InProgressRun<'a> {
    fn new(api: &'a dyn ChecksApi, id: u64, check_name: &str) -> Self {
        InProgressRun {
            api,
            id,
            check_name: check_name.to_string(),
            completed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Produce the verdict and issue the terminal update.
    ///
    /// On success the update carries the conclusion and output; a `failure`
    /// conclusion surfaces the summary. If `produce` or any publish call
    /// fails, the run is completed as `failure` without output and the
    /// error message is surfaced instead.
    pub fn complete<F>(mut self, produce: F) -> CompletedRun
    where
        F: FnOnce() -> Result<Verdict>,
    {
        let outcome = produce().and_then(|verdict| self.publish(verdict));
        self.completed = true;
        match outcome {
            Ok((conclusion, summary)) => {
                debug!(id = self.id, summary = %summary, "check run completed");
                CompletedRun {
                    id: self.id,
                    conclusion,
                    failure: (conclusion == Conclusion::Failure).then_some(summary),
                }
            }
            Err(err) => {
                self.fail();
                CompletedRun {
                    id: self.id,
                    conclusion: Conclusion::Failure,
                    failure: Some(err.to_string()),
                }
            }
        }
    }

    fn publish(&self, verdict: Verdict) -> Result<(Conclusion, String)> {
        let Verdict {
            conclusion,
            mut output,
        } = verdict;
        let summary = output.summary.clone();

        // Leading batches go out as non-terminal updates; the terminal
        // update carries the last one.
        let mut annotations = std::mem::take(&mut output.annotations);
        let mut batches = Vec::new();
        while annotations.len() > ANNOTATIONS_PER_REQUEST {
            let rest = annotations.split_off(ANNOTATIONS_PER_REQUEST);
            batches.push(std::mem::replace(&mut annotations, rest));
        }
        for batch in batches {
            self.api.update_check_run(
                self.id,
                &CheckRunUpdate::annotations(&output.title, &output.summary, batch),
            )?;
        }
        output.annotations = annotations;

        self.api.update_check_run(
            self.id,
            &CheckRunUpdate::complete(timestamp(), conclusion, Some(output)),
        )?;
        Ok((conclusion, summary))
    }

    fn fail(&self) {
        let update = CheckRunUpdate::complete(timestamp(), Conclusion::Failure, None);
        if let Err(err) = self.api.update_check_run(self.id, &update) {
            warn!(
                id = self.id,
                check = %self.check_name,
                error = %err,
                "could not mark check run failed"
            );
        }
    }
}

impl Drop for InProgressRun<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.completed = true;
            self.fail();
        }
    }
}
