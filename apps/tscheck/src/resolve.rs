//! Commit resolution: which commit the check run attaches to.

use crate::error::{Error, Result};
use crate::github::ChecksApi;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
/// How the triggering event identifies its commit.
pub enum CommitSource {
    /// Pull-request context: use the PR's most recent commit.
    PullRequest(u64),
    /// Direct push: use the supplied SHA unchanged.
    Push(String),
}

impl CommitSource {
    /// A PR number wins over a SHA; neither is an environment error.
    pub fn from_context(pr_number: Option<u64>, sha: Option<&str>) -> Result<Self> {
        // PR numbers start at 1; a zero from an empty input means "no PR".
        let pr_number = pr_number.filter(|n| *n > 0);
        match (pr_number, sha.map(str::trim).filter(|s| !s.is_empty())) {
            (Some(n), _) => Ok(CommitSource::PullRequest(n)),
            (None, Some(sha)) => Ok(CommitSource::Push(sha.to_string())),
            (None, None) => Err(Error::Environment(
                "cannot determine commit: no pull request number and no GITHUB_SHA".into(),
            )),
        }
    }
}

/// Resolve the target commit with one read call.
pub fn resolve_commit(api: &dyn ChecksApi, source: &CommitSource) -> Result<String> {
    let sha = match source {
        CommitSource::PullRequest(number) => api.pull_request_head(*number)?,
        CommitSource::Push(sha) => {
            api.get_commit(sha)?;
            sha.clone()
        }
    };
    debug!(commit = %sha, "commit resolved");
    Ok(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingApi};

    #[test]
    fn test_pull_request_uses_last_commit() {
        let api = RecordingApi::new().with_pr_commits(vec!["c1", "c2", "c3"]);
        let sha = resolve_commit(&api, &CommitSource::PullRequest(9)).unwrap();
        assert_eq!(sha, "c3");
        assert_eq!(api.calls(), vec![Call::PullRequestHead(9)]);
    }

    #[test]
    fn test_push_uses_sha_unchanged_after_fetch() {
        let api = RecordingApi::new();
        let sha = resolve_commit(&api, &CommitSource::Push("deadbeef".into())).unwrap();
        assert_eq!(sha, "deadbeef");
        assert_eq!(api.calls(), vec![Call::GetCommit("deadbeef".into())]);
    }

    #[test]
    fn test_push_with_unknown_commit_fails() {
        let api = RecordingApi::new().failing_get_commit();
        let err = resolve_commit(&api, &CommitSource::Push("nope".into())).unwrap_err();
        assert!(matches!(err, Error::Api(_)));
    }

    #[test]
    fn test_from_context() {
        assert_eq!(
            CommitSource::from_context(Some(3), Some("abc")).unwrap(),
            CommitSource::PullRequest(3)
        );
        assert_eq!(
            CommitSource::from_context(None, Some("abc")).unwrap(),
            CommitSource::Push("abc".into())
        );
        assert!(CommitSource::from_context(None, Some("  "))
            .unwrap_err()
            .is_environment());
        assert!(CommitSource::from_context(None, None)
            .unwrap_err()
            .is_environment());
    }

    #[test]
    fn test_from_context_zero_pr_number_is_not_a_pull_request() {
        assert_eq!(
            CommitSource::from_context(Some(0), Some("abc")).unwrap(),
            CommitSource::Push("abc".into())
        );
        assert!(CommitSource::from_context(Some(0), None)
            .unwrap_err()
            .is_environment());
    }
}
