use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("invalid source name: {0}")]
    InvalidSourceName(String),

    #[error("invalid repository name: {0}")]
    InvalidRepositoryName(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid local path in path group: {0}")]
    InvalidLocalPath(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("fetch step failed: {0}")]
    Fetch(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("sync failed: {0}")]
    Sync(String),

    #[error("LakeFS request failed: {0}")]
    LakeFsHttp(String),

    #[error("LakeFS returned status {status}: {message}")]
    LakeFsStatus { status: u16, message: String },
}
