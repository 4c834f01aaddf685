//! Diagnostic line grammar and annotation builder.
//!
//! Recognizes compiler lines of the shape
//! `<path>(<line>,<column>): <error|warning> <ruleId>: <message>` anywhere in
//! a multi-line text and turns them into check-run annotations plus a
//! `Verdict`. Lines that do not match are dropped silently.

use crate::models::{Annotation, CheckOutput, Conclusion, Diagnostic, Severity, Verdict};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Summary text for a `success` conclusion.
pub const SUMMARY_SUCCESS: &str = "Green lights";
/// Summary text for a `failure` conclusion.
pub const SUMMARY_FAILURE: &str = "TSC error";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Maps "were any diagnostics found" onto a conclusion.
///
/// `DiagnosticsFoundMeansPass` is the historical contract of this tool:
/// a run that reports at least one diagnostic concludes `success`, a run
/// that reports none concludes `failure`. Exit codes and check conclusions
/// downstream depend on it, so it stays the default.
pub enum Polarity {
    #[default]
    DiagnosticsFoundMeansPass,
    DiagnosticsFoundMeansFail,
}

impl Polarity {
    pub fn conclusion(self, found: bool) -> Conclusion {
        match (self, found) {
            (Polarity::DiagnosticsFoundMeansPass, true) => Conclusion::Success,
            (Polarity::DiagnosticsFoundMeansPass, false) => Conclusion::Failure,
            (Polarity::DiagnosticsFoundMeansFail, true) => Conclusion::Failure,
            (Polarity::DiagnosticsFoundMeansFail, false) => Conclusion::Success,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "diagnostics-found-means-pass" => Some(Polarity::DiagnosticsFoundMeansPass),
            "diagnostics-found-means-fail" => Some(Polarity::DiagnosticsFoundMeansFail),
            _ => None,
        }
    }
}

fn diagnostic_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // path: no parentheses, no line breaks; rule id: no whitespace, may be empty
        Regex::new(r"(?m)^([^()\r\n]+)\((\d+),(\d+)\): (error|warning) (\S*): (.*?)\r?$")
            .expect("diagnostic grammar is a valid regex")
    })
}

/// Extract every diagnostic in `text` in a single pass.
///
/// Matches with a zero or out-of-range line/column are not diagnostics.
pub fn parse_diagnostics(text: &str) -> Vec<Diagnostic> {
    diagnostic_line()
        .captures_iter(text)
        .filter_map(|caps| {
            let line = caps[2].parse::<u32>().ok().filter(|n| *n >= 1)?;
            let column = caps[3].parse::<u32>().ok().filter(|n| *n >= 1)?;
            Some(Diagnostic {
                path: caps[1].to_string(),
                line,
                column,
                severity: Severity::from_keyword(&caps[4])?,
                rule_id: caps[5].to_string(),
                message: caps[6].to_string(),
            })
        })
        .collect()
}

/// Convert one diagnostic into a single-position annotation.
pub fn to_annotation(diag: &Diagnostic, fallback_title: &str) -> Annotation {
    Annotation {
        path: diag.path.clone(),
        start_line: diag.line,
        end_line: diag.line,
        start_column: diag.column,
        end_column: diag.column,
        annotation_level: diag.severity.into(),
        title: if diag.rule_id.is_empty() {
            fallback_title.to_string()
        } else {
            diag.rule_id.clone()
        },
        message: diag.message.clone(),
    }
}

/// Build the `Verdict` for one compiler output.
///
/// `check_name` is used both as the output title and as the fallback
/// annotation title for diagnostics without a rule id. Never fails.
pub fn build_verdict(text: &str, check_name: &str, polarity: Polarity) -> Verdict {
    let annotations: Vec<Annotation> = parse_diagnostics(text)
        .iter()
        .map(|d| to_annotation(d, check_name))
        .collect();
    let conclusion = polarity.conclusion(!annotations.is_empty());
    let summary = match conclusion {
        Conclusion::Success => SUMMARY_SUCCESS,
        Conclusion::Failure => SUMMARY_FAILURE,
    };
    Verdict {
        conclusion,
        output: CheckOutput {
            title: check_name.to_string(),
            summary: summary.to_string(),
            annotations,
        },
    }
}
