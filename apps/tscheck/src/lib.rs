//! tscheck core library.
//!
//! Runs the TypeScript compiler in no-emit mode, parses its diagnostics
//! into annotations, and publishes them as a check run on the triggering
//! commit.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery, effective configuration, and CI context.
//! - `lint`: Diagnostic line grammar and verdict builder.
//! - `stream`: Line reassembly for compiler stdout.
//! - `resolve`: Target commit resolution.
//! - `reconcile`: Check-run find-or-create and terminal completion.
//! - `run`: Compiler launch and pipeline orchestration.
//! - `github`: Review-system API trait and HTTP client.
//! - `models`: Diagnostic, annotation, verdict, and wire structs.
//! - `output`: Human/JSON printers and the failure channel.
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod lint;
pub mod models;
pub mod output;
pub mod reconcile;
pub mod resolve;
pub mod run;
pub mod stream;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
