//! Output rendering for parsed verdicts and the failure channel.
//!
//! Supports `human` (default) and `json` outputs. Failure reasons are
//! written as `::error::` workflow commands so the CI runner surfaces them.

use crate::models::{AnnotationLevel, Conclusion, Verdict};
use crate::run::RunOutcome;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Print a verdict in the requested format.
pub fn print_verdict(verdict: &Verdict, output: &str) {
    match output {
        "json" => println!("{:#}", compose_verdict_json(verdict)),
        _ => {
            let color = use_colors(output);
            for a in &verdict.output.annotations {
                let (icon, sev) = match a.annotation_level {
                    AnnotationLevel::Failure => ("✖", "⟦failure⟧"),
                    AnnotationLevel::Warning => ("▲", "⟦warning⟧"),
                };
                let loc = format!("{}:{}:{}", a.path, a.start_line, a.start_column);
                if color {
                    let (icon, sev) = match a.annotation_level {
                        AnnotationLevel::Failure => {
                            (icon.red().to_string(), sev.red().bold().to_string())
                        }
                        AnnotationLevel::Warning => {
                            (icon.yellow().to_string(), sev.yellow().bold().to_string())
                        }
                    };
                    println!("{} {} {} ❲{}❳ {}", icon, sev, loc.bold(), a.title, a.message);
                } else {
                    println!("{} {} {} ❲{}❳ {}", icon, sev, loc, a.title, a.message);
                }
            }
            let summary = format!(
                "— {} — conclusion={} annotations={} ({})",
                verdict.output.title,
                verdict.conclusion.as_str(),
                verdict.output.annotations.len(),
                verdict.output.summary
            );
            if !color {
                println!("{}", summary);
            } else if verdict.conclusion == Conclusion::Success {
                println!("{}", summary.green().bold());
            } else {
                println!("{}", summary.red().bold());
            }
        }
    }
}

/// Compose verdict JSON (pure) for testing/snapshot purposes.
pub fn compose_verdict_json(verdict: &Verdict) -> JsonVal {
    json!({
        "conclusion": verdict.conclusion,
        "output": verdict.output,
        "summary": {
            "failures": verdict.output.annotations.iter()
                .filter(|a| a.annotation_level == AnnotationLevel::Failure).count(),
            "warnings": verdict.output.annotations.iter()
                .filter(|a| a.annotation_level == AnnotationLevel::Warning).count(),
        }
    })
}

/// One workflow command per failure reason. Newlines are escaped so a
/// multi-line reason stays one command.
pub fn failure_commands(failures: &[String]) -> Vec<String> {
    failures
        .iter()
        .map(|f| {
            let escaped = f
                .replace('%', "%25")
                .replace('\r', "%0D")
                .replace('\n', "%0A");
            format!("::error::{}", escaped)
        })
        .collect()
}

/// Print every failure reason on stdout, where the runner reads commands.
pub fn print_failures(failures: &[String]) {
    for line in failure_commands(failures) {
        println!("{}", line);
    }
}

/// Short end-of-run line on stderr for human readers.
pub fn print_run_summary(outcome: &RunOutcome) {
    let published = outcome.published.len();
    let failed = outcome.failures.len();
    if use_colors("human") {
        let line = format!("— Summary — published={} failures={}", published, failed);
        if failed > 0 {
            eprintln!("{}", line.red().bold());
        } else {
            eprintln!("{}", line.bold());
        }
    } else {
        eprintln!("— Summary — published={} failures={}", published, failed);
    }
}
