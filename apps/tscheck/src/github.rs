//! Review-system client: the five calls the check pipeline needs.
//!
//! `ChecksApi` is the seam between the pipeline and the network. The
//! production implementation talks to the GitHub REST and GraphQL APIs over
//! a blocking `reqwest` client; tests substitute an in-memory recorder.

use crate::models::check_run::{CheckRunList, CheckRunSummary, CheckRunUpdate, NewCheckRun};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("tscheck/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Query for the in-progress listing; a single page, no pagination.
pub const IN_PROGRESS_QUERY: [(&str, &str); 2] = [("status", "in_progress"), ("per_page", "100")];

const PR_LAST_COMMIT_QUERY: &str = r#"query($owner: String!, $name: String!, $prNumber: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $prNumber) {
      commits(last: 1) {
        nodes {
          commit {
            oid
          }
        }
      }
    }
  }
}"#;

/// Errors emitted by review-system calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the response not read.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// GraphQL endpoint answered with an `errors` array.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Calls against one repository in the review system.
pub trait ChecksApi {
    /// Head commit of a pull request: the last entry of its ordered commit
    /// list.
    fn pull_request_head(&self, number: u64) -> Result<String, ApiError>;

    /// Fetch commit metadata for `reference`; succeeds only if it exists.
    fn get_commit(&self, reference: &str) -> Result<(), ApiError>;

    /// Check runs currently `in_progress` for `reference`.
    fn list_in_progress(&self, reference: &str) -> Result<Vec<CheckRunSummary>, ApiError>;

    /// Create a check run and return its id.
    fn create_check_run(&self, run: &NewCheckRun) -> Result<u64, ApiError>;

    fn update_check_run(&self, id: u64, update: &CheckRunUpdate) -> Result<(), ApiError>;
}

/// Owner/name pair parsed from `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// Production client over the GitHub HTTP APIs.
pub struct GitHubClient {
    repo: RepoRef,
    token: String,
    api_url: String,
    graphql_url: String,
    http: reqwest::blocking::Client,
}

impl GitHubClient {
    /// Build a client. No request is sent here.
    pub fn new(
        repo: RepoRef,
        token: String,
        api_url: &str,
        graphql_url: &str,
    ) -> Result<Self, ApiError> {
        // Calls run to completion or fail; the blocking client's default
        // 30s limit is lifted.
        let http = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()?;
        Ok(GitHubClient {
            repo,
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            graphql_url: graphql_url.to_string(),
            http,
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        repo_endpoint(&self.api_url, &self.repo, tail)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        self.http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(&self.token)
    }
}

fn read_json<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// REST endpoint under `/repos/{owner}/{name}/`.
pub fn repo_endpoint(api_url: &str, repo: &RepoRef, tail: &str) -> String {
    format!(
        "{}/repos/{}/{}/{}",
        api_url.trim_end_matches('/'),
        repo.owner,
        repo.name,
        tail
    )
}

pub fn commit_path(reference: &str) -> String {
    format!("commits/{reference}")
}

/// Check runs attached to a commit reference.
pub fn check_runs_for_ref_path(reference: &str) -> String {
    format!("commits/{reference}/check-runs")
}

pub const CREATE_CHECK_RUN_PATH: &str = "check-runs";

/// One check run, the target of updates.
pub fn check_run_path(id: u64) -> String {
    format!("check-runs/{id}")
}

/// GraphQL request body for the pull request's last commit.
pub fn pr_last_commit_request(repo: &RepoRef, number: u64) -> Json {
    json!({
        "query": PR_LAST_COMMIT_QUERY,
        "variables": {
            "owner": repo.owner,
            "name": repo.name,
            "prNumber": number,
        }
    })
}

/// Pull the last commit oid out of a GraphQL response.
pub fn parse_pr_last_commit(resp: &Json) -> Result<String, ApiError> {
    if let Some(errors) = resp.get("errors").and_then(Json::as_array) {
        if !errors.is_empty() {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Json::as_str))
                .collect();
            return Err(ApiError::GraphQl(msgs.join("; ")));
        }
    }
    resp.pointer("/data/repository/pullRequest/commits/nodes")
        .and_then(Json::as_array)
        .and_then(|nodes| nodes.last())
        .and_then(|node| node.pointer("/commit/oid"))
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Parse("pull request has no commits".into()))
}

#[derive(Deserialize)]
struct CreatedCheckRun {
    id: u64,
}

impl ChecksApi for GitHubClient {
    fn pull_request_head(&self, number: u64) -> Result<String, ApiError> {
        let resp = self
            .request(reqwest::Method::POST, &self.graphql_url)
            .json(&pr_last_commit_request(&self.repo, number))
            .send()?;
        let body: Json = read_json(resp)?;
        parse_pr_last_commit(&body)
    }

    fn get_commit(&self, reference: &str) -> Result<(), ApiError> {
        let url = self.repo_url(&commit_path(reference));
        let resp = self.request(reqwest::Method::GET, &url).send()?;
        let _: Json = read_json(resp)?;
        Ok(())
    }

    fn list_in_progress(&self, reference: &str) -> Result<Vec<CheckRunSummary>, ApiError> {
        let url = self.repo_url(&check_runs_for_ref_path(reference));
        let resp = self
            .request(reqwest::Method::GET, &url)
            .query(&IN_PROGRESS_QUERY)
            .send()?;
        let list: CheckRunList = read_json(resp)?;
        Ok(list.check_runs)
    }

    fn create_check_run(&self, run: &NewCheckRun) -> Result<u64, ApiError> {
        let resp = self
            .request(reqwest::Method::POST, &self.repo_url(CREATE_CHECK_RUN_PATH))
            .json(run)
            .send()?;
        let created: CreatedCheckRun = read_json(resp)?;
        Ok(created.id)
    }

    fn update_check_run(&self, id: u64, update: &CheckRunUpdate) -> Result<(), ApiError> {
        let url = self.repo_url(&check_run_path(id));
        let resp = self
            .request(reqwest::Method::PATCH, &url)
            .json(update)
            .send()?;
        let _: Json = read_json(resp)?;
        Ok(())
    }
}
