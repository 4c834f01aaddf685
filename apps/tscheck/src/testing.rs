//! In-memory `ChecksApi` that records every call, for unit tests.

use crate::github::{ApiError, ChecksApi};
use crate::models::check_run::{CheckRunSummary, CheckRunUpdate, NewCheckRun};
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PullRequestHead(u64),
    GetCommit(String),
    ListInProgress(String),
    Create(NewCheckRun),
    Update(u64, CheckRunUpdate),
}

#[derive(Debug, Default)]
pub struct RecordingApi {
    calls: RefCell<Vec<Call>>,
    pr_commits: Vec<String>,
    in_progress: Vec<CheckRunSummary>,
    next_id: Cell<u64>,
    fail_get_commit: bool,
    fail_list: bool,
    fail_create: bool,
    fail_updates: Cell<usize>,
}

impl RecordingApi {
    pub fn new() -> Self {
        RecordingApi {
            next_id: Cell::new(100),
            ..Default::default()
        }
    }

    pub fn with_pr_commits(mut self, oids: Vec<&str>) -> Self {
        self.pr_commits = oids.into_iter().map(String::from).collect();
        self
    }

    pub fn with_in_progress(mut self, runs: Vec<(u64, &str)>) -> Self {
        self.in_progress = runs
            .into_iter()
            .map(|(id, name)| CheckRunSummary {
                id,
                name: name.to_string(),
                status: Some("in_progress".into()),
            })
            .collect();
        self
    }

    pub fn failing_get_commit(mut self) -> Self {
        self.fail_get_commit = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail the first `n` update calls.
    pub fn failing_updates(self, n: usize) -> Self {
        self.fail_updates.set(n);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn creates(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }

    pub fn updates(&self) -> Vec<(u64, CheckRunUpdate)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Update(id, u) => Some((*id, u.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_updates(&self) -> Vec<(u64, CheckRunUpdate)> {
        self.updates()
            .into_iter()
            .filter(|(_, u)| u.is_terminal())
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn boom(what: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        message: format!("{what} failed"),
    }
}

impl ChecksApi for RecordingApi {
    fn pull_request_head(&self, number: u64) -> Result<String, ApiError> {
        self.record(Call::PullRequestHead(number));
        self.pr_commits
            .last()
            .cloned()
            .ok_or_else(|| ApiError::Parse("pull request has no commits".into()))
    }

    fn get_commit(&self, reference: &str) -> Result<(), ApiError> {
        self.record(Call::GetCommit(reference.to_string()));
        if self.fail_get_commit {
            return Err(ApiError::Status {
                status: 422,
                message: "No commit found".into(),
            });
        }
        Ok(())
    }

    fn list_in_progress(&self, reference: &str) -> Result<Vec<CheckRunSummary>, ApiError> {
        self.record(Call::ListInProgress(reference.to_string()));
        if self.fail_list {
            return Err(boom("list"));
        }
        Ok(self.in_progress.clone())
    }

    fn create_check_run(&self, run: &NewCheckRun) -> Result<u64, ApiError> {
        self.record(Call::Create(run.clone()));
        if self.fail_create {
            return Err(boom("create"));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(id)
    }

    fn update_check_run(&self, id: u64, update: &CheckRunUpdate) -> Result<(), ApiError> {
        self.record(Call::Update(id, update.clone()));
        let left = self.fail_updates.get();
        if left > 0 {
            self.fail_updates.set(left - 1);
            return Err(boom("update"));
        }
        Ok(())
    }
}
