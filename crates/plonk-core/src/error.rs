//! Error types for plonk-core.

use std::path::PathBuf;

use miette::Diagnostic;
use plonk_utils::error::FileSystemError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Failed to read lock file '{path}'")]
    #[diagnostic(
        code(plonk::lock_read),
        help("Check the file permissions, or remove it to start from an empty state")
    )]
    LockRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lock file '{path}': {source}")]
    #[diagnostic(
        code(plonk::lock_read),
        help("The lock file is YAML with a top-level 'version' and 'resources' list")
    )]
    LockParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write lock file '{path}'")]
    #[diagnostic(
        code(plonk::lock_write),
        help("Check write permissions on the plonk directory")
    )]
    LockWrite {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Duplicate lock entry for {manager}:{name}")]
    #[diagnostic(code(plonk::lock_write))]
    DuplicateLockEntry { manager: String, name: String },

    #[error("File not found: '{path}'")]
    #[diagnostic(
        code(plonk::file_not_found),
        help("Check the path; dotfiles are addressed by their location in $HOME")
    )]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileIo(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] plonk_utils::error::PathError),

    #[error("Invalid package spec '{spec}': {reason}")]
    #[diagnostic(
        code(plonk::invalid_input),
        help("Package specs take the form [manager:]name[@version], e.g. 'brew:jq'")
    )]
    InvalidSpec { spec: String, reason: String },

    #[error("Reconciliation failed for the {domain} domain: {message}")]
    #[diagnostic(code(plonk::reconciliation))]
    Reconciliation { domain: String, message: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
