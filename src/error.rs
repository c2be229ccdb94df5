use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BackupError {
    #[error("store code list not found: {0}")]
    #[diagnostic(help("create the file with one store code per line"))]
    MissingInput(PathBuf),

    #[error("failed to read store code list at {path}: {message}")]
    InputRead { path: PathBuf, message: String },

    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("smoke test for store {0} failed")]
    #[diagnostic(help("the token is likely expired or the IP is rate limited"))]
    SmokeTestFailed(String),
}
