//! Error types for debpress-core

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while driving the packaging pipeline
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read project config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no version declaration found in '{0}'")]
    VersionNotFound(PathBuf),

    #[error("changelog template missing: {0}")]
    TemplateMissing(PathBuf),

    #[error("unknown release '{name}', expected one of: {known}")]
    UnknownRelease { name: String, known: String },

    #[error("workspace assembly failed: {0}")]
    Assembly(String),

    #[error("command `{command}` exited with {status}")]
    ExternalTool {
        command: String,
        status: ExitStatus,
        /// Combined stdout/stderr transcript, for diagnostics.
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
