//! One compiler-reported issue as recognized by the line grammar.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Map the literal keyword from compiler output. Anything else is not a
    /// diagnostic.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Parsed diagnostic line. `line` and `column` are 1-based and never zero.
pub struct Diagnostic {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    /// Compiler rule code such as `TS2322`; may be empty.
    pub rule_id: String,
    pub message: String,
}
