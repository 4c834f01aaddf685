//! Run orchestration: launch the compiler, stream its stdout through the
//! check pipeline, and collect failure reasons for the outer boundary.

use crate::config::{CompilerCommand, Effective, ReportMode};
use crate::error::{Error, Result};
use crate::github::ChecksApi;
use crate::lint::{build_verdict, Polarity};
use crate::reconcile::{self, CompletedRun};
use crate::resolve::{resolve_commit, CommitSource};
use crate::stream::LineBuffer;
use std::io::Read;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Fixed compiler flags: no output artifacts, no truncation, no ANSI.
pub const COMPILER_FLAGS: [&str; 4] = ["--noEmit", "--noErrorTruncation", "--pretty", "false"];

const READ_CHUNK: usize = 8 * 1024;

/// Settings the pipeline needs for every publish.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub check_name: String,
    pub job_name: Option<String>,
    pub polarity: Polarity,
}

impl From<&Effective> for PipelineSettings {
    fn from(eff: &Effective) -> Self {
        PipelineSettings {
            check_name: eff.check_name.clone(),
            job_name: eff.job_name.clone(),
            polarity: eff.polarity,
        }
    }
}

/// Parse -> reconcile -> publish, once per batch of compiler output.
///
/// The target commit is resolved on first use; the outcome, success or
/// failure, is reused for the rest of the invocation.
pub struct Pipeline<'a> {
    api: &'a dyn ChecksApi,
    source: CommitSource,
    settings: PipelineSettings,
    commit: Option<std::result::Result<String, String>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn ChecksApi, source: CommitSource, settings: PipelineSettings) -> Self {
        Pipeline {
            api,
            source,
            settings,
            commit: None,
        }
    }

    fn commit(&mut self) -> Result<String> {
        match &self.commit {
            Some(Ok(sha)) => return Ok(sha.clone()),
            Some(Err(reason)) => return Err(Error::Unresolved(reason.clone())),
            None => {}
        }
        match resolve_commit(self.api, &self.source) {
            Ok(sha) => {
                self.commit = Some(Ok(sha.clone()));
                Ok(sha)
            }
            Err(err) => {
                self.commit = Some(Err(err.to_string()));
                Err(err)
            }
        }
    }

    /// True once commit resolution has failed; nothing more can be published.
    pub fn commit_failed(&self) -> bool {
        matches!(self.commit, Some(Err(_)))
    }

    /// Publish one batch of raw stdout bytes as a check run.
    pub fn report(&mut self, chunk: &[u8]) -> Result<CompletedRun> {
        let sha = self.commit()?;
        let run = reconcile::start(
            self.api,
            &self.settings.check_name,
            self.settings.job_name.as_deref(),
            &sha,
        )?;
        let settings = &self.settings;
        let done = run.complete(|| {
            // Undecodable bytes are replaced; the rest of the batch still parses.
            let text = String::from_utf8_lossy(chunk);
            Ok(build_verdict(&text, &settings.check_name, settings.polarity))
        });
        info!(
            id = done.id,
            conclusion = done.conclusion.as_str(),
            "check run published"
        );
        Ok(done)
    }
}

#[derive(Debug, Default)]
/// What the invocation has to say at its outer boundary.
pub struct RunOutcome {
    pub published: Vec<CompletedRun>,
    pub failures: Vec<String>,
    pub compiler_exit: Option<i32>,
}

impl RunOutcome {
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record(&mut self, result: Result<CompletedRun>) {
        match result {
            Ok(done) => {
                if let Some(reason) = &done.failure {
                    self.failures.push(reason.clone());
                }
                self.published.push(done);
            }
            Err(err) => self.failures.push(err.to_string()),
        }
    }
}

fn build_command(compiler: &CompilerCommand) -> Command {
    let mut cmd = Command::new(&compiler.program);
    if let Some(script) = &compiler.script {
        cmd.arg(script);
    }
    cmd.args(COMPILER_FLAGS);
    cmd
}

/// Launch the compiler and drive the pipeline with its stdout.
///
/// Launch failures are returned as `Err`; every other failure ends up in
/// `RunOutcome::failures`. The compiler's own exit status is logged only.
pub fn run(
    compiler: &CompilerCommand,
    report: ReportMode,
    pipeline: &mut Pipeline<'_>,
) -> Result<RunOutcome> {
    let mut cmd = build_command(compiler);
    debug!(?cmd, "launching compiler");
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| Error::Launch {
            program: compiler.program.clone(),
            source,
        })?;

    let mut outcome = RunOutcome::default();
    let mut lines = LineBuffer::new();
    let mut collected: Vec<u8> = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match stdout.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    outcome.failures.push(Error::Io(e).to_string());
                    break;
                }
            };
            // Keep draining stdout so the compiler never blocks on the pipe
            if pipeline.commit_failed() {
                continue;
            }
            match report {
                ReportMode::PerChunk => {
                    if let Some(complete) = lines.push(&buf[..n]) {
                        outcome.record(pipeline.report(&complete));
                    }
                }
                ReportMode::Once => collected.extend_from_slice(&buf[..n]),
            }
        }
    }
    if !pipeline.commit_failed() {
        match report {
            ReportMode::PerChunk => {
                if let Some(rest) = lines.finish() {
                    outcome.record(pipeline.report(&rest));
                }
            }
            ReportMode::Once => outcome.record(pipeline.report(&collected)),
        }
    }

    match child.wait() {
        Ok(status) => {
            outcome.compiler_exit = status.code();
            debug!(code = ?status.code(), "compiler exited");
        }
        Err(e) => warn!(error = %e, "could not reap compiler process"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conclusion;
    use crate::testing::{Call, RecordingApi};
    use std::fs;
    use tempfile::tempdir;

    fn settings(job: Option<&str>) -> PipelineSettings {
        PipelineSettings {
            check_name: "TSC".into(),
            job_name: job.map(String::from),
            polarity: Polarity::default(),
        }
    }

    fn script_compiler(dir: &std::path::Path, body: &str) -> CompilerCommand {
        let script = dir.join("fake-tsc.sh");
        fs::write(&script, body).unwrap();
        CompilerCommand {
            program: "sh".into(),
            script: Some(script),
        }
    }

    #[test]
    fn test_pipeline_resolves_commit_once() {
        let api = RecordingApi::new().with_pr_commits(vec!["c1", "head"]);
        let mut p = Pipeline::new(&api, CommitSource::PullRequest(4), settings(None));
        p.report(b"a.ts(1,1): error TS1: x\n").unwrap();
        p.report(b"b.ts(2,2): error TS2: y\n").unwrap();
        let heads = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::PullRequestHead(_)))
            .count();
        assert_eq!(heads, 1);
        assert_eq!(api.creates(), 2);
        for call in api.calls() {
            if let Call::Create(new) = call {
                assert_eq!(new.head_sha, "head");
            }
        }
    }

    #[test]
    fn test_pipeline_commit_failure_creates_nothing() {
        let api = RecordingApi::new().failing_get_commit();
        let mut p = Pipeline::new(&api, CommitSource::Push("x".into()), settings(None));
        assert!(p.report(b"a.ts(1,1): error TS1: x\n").is_err());
        assert_eq!(api.creates(), 0);
        assert!(api.updates().is_empty());
    }

    #[test]
    fn test_pipeline_commit_failure_is_not_retried() {
        let api = RecordingApi::new().failing_get_commit();
        let mut p = Pipeline::new(&api, CommitSource::Push("x".into()), settings(None));
        let first = p.report(b"a.ts(1,1): error TS1: x\n").unwrap_err();
        assert!(matches!(first, Error::Api(_)));
        for _ in 0..2 {
            let again = p.report(b"b.ts(2,2): error TS2: y\n").unwrap_err();
            assert_eq!(again.to_string(), first.to_string());
        }
        assert!(p.commit_failed());
        let lookups = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::GetCommit(_)))
            .count();
        assert_eq!(lookups, 1);
        assert_eq!(api.creates(), 0);
    }

    #[test]
    fn test_run_stops_publishing_after_commit_failure() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(
            dir.path(),
            "echo 'a.ts(1,1): error TS1: x'\nsleep 0.2\necho 'b.ts(2,2): error TS2: y'\n",
        );
        let api = RecordingApi::new().failing_get_commit();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert_eq!(out.failures.len(), 1);
        assert_eq!(api.calls(), vec![Call::GetCommit("sha".into())]);
    }

    #[test]
    fn test_pipeline_invalid_utf8_keeps_valid_diagnostics() {
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let done = p
            .report(b"src/caf\xe9.ts(1,1): error TS2322: Type mismatch\nsrc/ok.ts(2,3): error TS1: y\n")
            .unwrap();
        assert_eq!(done.conclusion, Conclusion::Success);
        assert_eq!(done.failure, None);
        let terminal = api.terminal_updates();
        let ann = &terminal[0].1.output.as_ref().unwrap().annotations;
        assert_eq!(ann.len(), 2);
        assert_eq!(ann[0].path, "src/caf\u{fffd}.ts");
        assert_eq!(ann[1].path, "src/ok.ts");
        assert_eq!(ann[1].start_line, 2);
        assert_eq!(ann[1].start_column, 3);
    }

    #[test]
    fn test_run_flags_are_passed_to_compiler() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(dir.path(), "echo \"x.ts(1,1): error TS1: $*\"\n");
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert!(!out.failed());
        let terminal = api.terminal_updates();
        let output = terminal[0].1.output.as_ref().unwrap();
        assert_eq!(
            output.annotations[0].message,
            "--noEmit --noErrorTruncation --pretty false"
        );
    }

    #[test]
    fn test_run_with_diagnostics_succeeds_and_ignores_compiler_exit_code() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(
            dir.path(),
            "printf 'src/app.ts(12,5): error TS2322: Type mismatch\\n'\nexit 2\n",
        );
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert_eq!(out.compiler_exit, Some(2));
        assert!(!out.failed());
        assert_eq!(out.published.len(), 1);
        assert_eq!(out.published[0].conclusion, Conclusion::Success);
    }

    #[test]
    fn test_run_split_line_is_reassembled() {
        let dir = tempdir().unwrap();
        // Second half arrives after a pause, as a separate pipe read
        let compiler = script_compiler(
            dir.path(),
            "printf 'src/a.ts(3,'\nsleep 0.2\nprintf '4): error TS2304: Cannot find name\\n'\n",
        );
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert!(!out.failed());
        let terminal = api.terminal_updates();
        assert_eq!(terminal.len(), 1);
        let ann = &terminal[0].1.output.as_ref().unwrap().annotations;
        assert_eq!(ann.len(), 1);
        assert_eq!(ann[0].path, "src/a.ts");
        assert_eq!(ann[0].start_column, 4);
    }

    #[test]
    fn test_run_per_chunk_with_silent_compiler_publishes_nothing() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(dir.path(), "exit 0\n");
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert!(out.published.is_empty());
        assert!(!out.failed());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_run_once_with_no_diagnostics_fails() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(dir.path(), "echo 'Found 0 errors.'\n");
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::Once, &mut p).unwrap();
        assert_eq!(out.failures, vec!["TSC error".to_string()]);
        assert_eq!(api.terminal_updates().len(), 1);
    }

    #[test]
    fn test_run_reporting_error_is_collected() {
        let dir = tempdir().unwrap();
        let compiler = script_compiler(dir.path(), "echo 'a.ts(1,1): error TS1: x'\n");
        let api = RecordingApi::new().failing_create();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let out = run(&compiler, ReportMode::PerChunk, &mut p).unwrap();
        assert_eq!(out.failures.len(), 1);
        assert!(out.failures[0].contains("create failed"));
    }

    #[test]
    fn test_launch_failure_is_an_error() {
        let compiler = CompilerCommand {
            program: "/nonexistent/tsc-binary".into(),
            script: None,
        };
        let api = RecordingApi::new();
        let mut p = Pipeline::new(&api, CommitSource::Push("sha".into()), settings(None));
        let err = run(&compiler, ReportMode::PerChunk, &mut p).unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
        assert!(api.calls().is_empty());
    }
}
