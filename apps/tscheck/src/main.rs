//! tscheck CLI binary entry point.
//! Resolves configuration, runs the pipeline, and maps failures to exit codes.

use clap::Parser;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tscheck::cli::{Cli, Commands};
use tscheck::config::{self, Overrides};
use tscheck::github::GitHubClient;
use tscheck::lint::build_verdict;
use tscheck::models::Conclusion;
use tscheck::run::{self, Pipeline};
use tscheck::{output, Error};

/// Exit code for configuration/environment problems.
const EXIT_CONFIG: i32 = 2;

fn fail(err: &Error) -> ! {
    output::print_failures(&[err.to_string()]);
    std::process::exit(if err.is_environment() { EXIT_CONFIG } else { 1 });
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Run {
            repo_root,
            token,
            sha,
            repository,
            event_path,
            pr_number,
            job_name,
            api_url,
            graphql_url,
            report,
        } => {
            let eff = config::resolve_effective(Overrides {
                repo_root,
                job_name,
                report,
                output: None,
                api_url,
                graphql_url,
            })
            .unwrap_or_else(|e| fail(&e));
            // Everything is validated before the compiler starts
            let ctx = config::resolve_context(
                token.as_deref(),
                repository.as_deref(),
                sha.as_deref(),
                pr_number,
                event_path.as_deref().map(Path::new),
            )
            .unwrap_or_else(|e| fail(&e));
            let client = GitHubClient::new(ctx.repo, ctx.token, &eff.api_url, &eff.graphql_url)
                .unwrap_or_else(|e| fail(&Error::from(e)));
            let mut pipeline = Pipeline::new(&client, ctx.commit, (&eff).into());
            let outcome = run::run(&eff.compiler, eff.report, &mut pipeline)
                .unwrap_or_else(|e| fail(&e));
            output::print_run_summary(&outcome);
            if outcome.failed() {
                output::print_failures(&outcome.failures);
                std::process::exit(1);
            }
        }
        Commands::Parse {
            file,
            repo_root,
            output,
        } => {
            let eff = config::resolve_effective(Overrides {
                repo_root,
                output,
                ..Default::default()
            })
            .unwrap_or_else(|e| fail(&e));
            let text = match file {
                Some(path) => std::fs::read_to_string(&path).map_err(Error::from),
                None => {
                    let mut s = String::new();
                    std::io::stdin()
                        .read_to_string(&mut s)
                        .map(|_| s)
                        .map_err(Error::from)
                }
            }
            .unwrap_or_else(|e| fail(&e));
            let verdict = build_verdict(&text, &eff.check_name, eff.polarity);
            output::print_verdict(&verdict, &eff.output);
            if verdict.conclusion == Conclusion::Failure {
                if eff.output != "json" {
                    output::print_failures(&[verdict.output.summary.clone()]);
                }
                std::process::exit(1);
            }
        }
    }
}
