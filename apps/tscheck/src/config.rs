//! Configuration discovery and effective settings resolution.
//!
//! tscheck reads `tscheck.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags and the CI environment to produce
//! an `Effective` config. Defaults:
//! - `check_name`: `TSC`
//! - `report`: `per-chunk`
//! - `polarity`: `diagnostics-found-means-pass`
//! - `output`: `human`
//! - `api_url`: `https://api.github.com`, `graphql_url`: `<api_url>/graphql`
//! - `compiler.program`: `node`
//! - `compiler.script`: `node_modules/typescript/bin/tsc` under the repo root
//!
//! Overrides precedence: CLI/env > config file > defaults.

use crate::error::{Error, Result};
use crate::github::{RepoRef, DEFAULT_API_URL};
use crate::lint::Polarity;
use crate::resolve::CommitSource;
use serde::Deserialize;
use serde_json::Value as Json;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CHECK_NAME: &str = "TSC";
pub const DEFAULT_TSC_SCRIPT: &str = "node_modules/typescript/bin/tsc";

#[derive(Debug, Default, Deserialize, Clone)]
/// `[compiler]` section: how to launch the type checker.
pub struct CompilerCfg {
    pub program: Option<String>,
    pub script: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `tscheck.toml|yaml`.
pub struct TscheckConfig {
    pub check_name: Option<String>,
    pub job_name: Option<String>,
    pub report: Option<ReportMode>,
    pub polarity: Option<Polarity>,
    pub output: Option<String>,
    pub api_url: Option<String>,
    pub graphql_url: Option<String>,
    #[serde(default)]
    pub compiler: Option<CompilerCfg>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// When compiler output is handed to the check pipeline.
pub enum ReportMode {
    /// Every batch of complete stdout lines is published as it arrives.
    #[default]
    PerChunk,
    /// All stdout is collected and published once after the process exits.
    Once,
}

impl ReportMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "per-chunk" => Some(ReportMode::PerChunk),
            "once" => Some(ReportMode::Once),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Program plus leading arguments; the no-emit flags are appended at launch.
pub struct CompilerCommand {
    pub program: String,
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
/// Values supplied on the command line (or through their env fallbacks).
pub struct Overrides {
    pub repo_root: Option<String>,
    pub job_name: Option<String>,
    pub report: Option<String>,
    pub output: Option<String>,
    pub api_url: Option<String>,
    pub graphql_url: Option<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration after applying precedence.
pub struct Effective {
    pub check_name: String,
    pub job_name: Option<String>,
    pub report: ReportMode,
    pub polarity: Polarity,
    pub output: String,
    pub api_url: String,
    pub graphql_url: String,
    pub compiler: CompilerCommand,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `tscheck.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("tscheck.toml").exists()
            || cur.join("tscheck.yaml").exists()
            || cur.join("tscheck.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `TscheckConfig` from `tscheck.toml` or `tscheck.yaml|yml` if present.
///
/// A present but unreadable or invalid file is an error, not a silent default.
pub fn load_config(root: &Path) -> Result<Option<TscheckConfig>> {
    let toml_path = root.join("tscheck.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path)?;
        let cfg = toml::from_str(&s).map_err(|e| {
            Error::Environment(format!("invalid {}: {}", toml_path.display(), e))
        })?;
        return Ok(Some(cfg));
    }
    for yml in ["tscheck.yaml", "tscheck.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p)?;
            let cfg = serde_yaml::from_str(&s)
                .map_err(|e| Error::Environment(format!("invalid {}: {}", p.display(), e)))?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: Overrides) -> Result<Effective> {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root)?.unwrap_or_default();

    let check_name = cfg
        .check_name
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHECK_NAME.to_string());

    let job_name = cli
        .job_name
        .or(cfg.job_name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let report = match cli.report.as_deref() {
        Some(s) => ReportMode::parse(s).ok_or_else(|| {
            Error::Environment(format!("unknown report mode '{s}' (expected per-chunk|once)"))
        })?,
        None => cfg.report.unwrap_or_default(),
    };

    let output = cli
        .output
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let api_url = cli
        .api_url
        .or(cfg.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let graphql_url = cli
        .graphql_url
        .or(cfg.graphql_url)
        .unwrap_or_else(|| format!("{}/graphql", api_url.trim_end_matches('/')));

    let compiler_cfg = cfg.compiler.unwrap_or_default();
    let compiler = CompilerCommand {
        program: compiler_cfg.program.unwrap_or_else(|| "node".to_string()),
        script: Some(repo_root.join(
            compiler_cfg
                .script
                .as_deref()
                .unwrap_or(DEFAULT_TSC_SCRIPT),
        )),
    };

    Ok(Effective {
        check_name,
        job_name,
        report,
        polarity: cfg.polarity.unwrap_or_default(),
        output,
        api_url,
        graphql_url,
        compiler,
    })
}

#[derive(Clone)]
/// Identity of the triggering CI event, read once at startup.
pub struct RunContext {
    pub token: String,
    pub repo: RepoRef,
    pub commit: CommitSource,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("commit", &self.commit)
            .finish()
    }
}

/// Validate the CI environment before anything is launched.
///
/// The PR number comes from `pr_number` or, failing that, the event payload
/// at `event_path`.
pub fn resolve_context(
    token: Option<&str>,
    repository: Option<&str>,
    sha: Option<&str>,
    pr_number: Option<u64>,
    event_path: Option<&Path>,
) -> Result<RunContext> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Environment("GITHUB_TOKEN is required".into()))?;
    let repository = repository
        .ok_or_else(|| Error::Environment("GITHUB_REPOSITORY is required".into()))?;
    let repo = RepoRef::parse(repository).ok_or_else(|| {
        Error::Environment(format!("invalid repository '{repository}' (expected owner/repo)"))
    })?;
    let pr_number = match pr_number {
        Some(n) => Some(n),
        None => match event_path {
            Some(p) if p.exists() => event_pr_number(p)?,
            _ => None,
        },
    };
    Ok(RunContext {
        token: token.to_string(),
        repo,
        commit: CommitSource::from_context(pr_number, sha)?,
    })
}

/// PR number from an event payload: `pull_request.number`, then
/// `issue.number`, then top-level `number`.
pub fn event_pr_number(path: &Path) -> Result<Option<u64>> {
    let s = fs::read_to_string(path)?;
    let payload: Json = serde_json::from_str(&s).map_err(|e| {
        Error::Environment(format!("invalid event payload {}: {}", path.display(), e))
    })?;
    Ok(["/pull_request/number", "/issue/number", "/number"]
        .iter()
        .find_map(|ptr| payload.pointer(ptr).and_then(Json::as_u64))
        .filter(|n| *n > 0))
}
