//! Shared data models for parsed diagnostics, check-run annotations, and
//! the wire shapes exchanged with the review system.

pub mod check_run;
pub mod diagnostic;

use serde::Serialize;

pub use diagnostic::{Diagnostic, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Annotation level understood by the check-runs API.
pub enum AnnotationLevel {
    Failure,
    Warning,
}

impl From<Severity> for AnnotationLevel {
    fn from(sev: Severity) -> Self {
        match sev {
            Severity::Error => AnnotationLevel::Failure,
            Severity::Warning => AnnotationLevel::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single-position annotation derived 1:1 from a `Diagnostic`.
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub annotation_level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Terminal outcome of a check run.
pub enum Conclusion {
    Success,
    Failure,
}

impl Conclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Output payload attached to a completed check run.
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Aggregate result of one compiler output: conclusion plus payload.
pub struct Verdict {
    pub conclusion: Conclusion,
    pub output: CheckOutput,
}
