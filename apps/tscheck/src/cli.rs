//! CLI argument parsing via `clap`.
//!
//! Every `run` input can also come from the GitHub Actions environment.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tscheck",
    version,
    about = "Publish TypeScript diagnostics as a GitHub check run",
    long_about = "tscheck runs the TypeScript compiler in no-emit mode, parses its diagnostics, and publishes them as inline annotations on a check run for the triggering commit.\n\nConfiguration precedence: CLI/env > tscheck.toml > defaults.",
    after_help = "Examples:\n  tscheck run --job-name build\n  tsc --noEmit --pretty false | tscheck parse --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log level filter (trace|debug|info|warn|error)"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current tscheck version.")]
    Version,
    /// Compile and publish the check run
    #[command(
        about = "Run the compiler and publish a check run",
        long_about = "Launch the TypeScript compiler with --noEmit --noErrorTruncation --pretty false and publish each batch of diagnostics as a check run on the resolved commit.",
        after_help = "Examples:\n  tscheck run\n  tscheck run --job-name \"Build and test\" --report once"
    )]
    Run {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "API token")]
        token: Option<String>,
        #[arg(long, env = "GITHUB_SHA", help = "Commit SHA for push-triggered runs")]
        sha: Option<String>,
        #[arg(long, env = "GITHUB_REPOSITORY", help = "Repository as owner/repo")]
        repository: Option<String>,
        #[arg(long, env = "GITHUB_EVENT_PATH", help = "Event payload used to detect the PR number")]
        event_path: Option<String>,
        #[arg(long, help = "Pull request number (overrides the event payload)")]
        pr_number: Option<u64>,
        #[arg(
            long,
            env = "INPUT_JOB-NAME",
            help = "Attach to the in-progress check run with this name (case-insensitive)"
        )]
        job_name: Option<String>,
        #[arg(long, env = "GITHUB_API_URL", help = "REST API base URL")]
        api_url: Option<String>,
        #[arg(long, env = "GITHUB_GRAPHQL_URL", help = "GraphQL endpoint URL")]
        graphql_url: Option<String>,
        #[arg(long, help = "Report mode: per-chunk|once (default: per-chunk)")]
        report: Option<String>,
    },
    /// Parse captured compiler output offline
    #[command(
        about = "Parse compiler output without publishing",
        long_about = "Read captured compiler stdout from FILE (or stdin) and print the resulting verdict. The exit code follows the same verdict polarity as `run`.",
        after_help = "Examples:\n  tscheck parse tsc.log\n  tsc --noEmit --pretty false | tscheck parse --output json"
    )]
    Parse {
        #[arg(help = "File with compiler output (default: stdin)")]
        file: Option<String>,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}
