//! Error types for plonk-utils.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for path operations.
#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Path is empty")]
    #[diagnostic(code(plonk_utils::path::empty), help("Provide a non-empty path"))]
    Empty,

    #[error("Environment variable 'HOME' is not set")]
    #[diagnostic(
        code(plonk_utils::path::no_home),
        help("Set the HOME environment variable")
    )]
    NoHome,

    #[error("Path '{path}' is not inside the home directory")]
    #[diagnostic(
        code(plonk_utils::path::outside_home),
        help("Dotfiles must live under your home directory")
    )]
    OutsideHome { path: PathBuf },
}

/// Error type for filesystem operations.
#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to read file '{path}'")]
    #[diagnostic(
        code(plonk_utils::fs::read_file),
        help("Check if the file exists and you have read permissions")
    )]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}'")]
    #[diagnostic(
        code(plonk_utils::fs::write_file),
        help("Check if you have write permissions to the directory")
    )]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}'")]
    #[diagnostic(
        code(plonk_utils::fs::remove_file),
        help("Check if you have write permissions to the file")
    )]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}'")]
    #[diagnostic(
        code(plonk_utils::fs::read_dir),
        help("Check if the directory exists and you have read permissions")
    )]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}'")]
    #[diagnostic(
        code(plonk_utils::fs::create_dir),
        help("Check if the parent directory exists and you have write permissions")
    )]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename '{from}' to '{to}'")]
    #[diagnostic(
        code(plonk_utils::fs::rename),
        help("Source and destination must be on the same filesystem")
    )]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path '{path}' exists but is not a directory")]
    #[diagnostic(code(plonk_utils::fs::not_a_directory))]
    NotADirectory { path: PathBuf },
}

pub type PathResult<T> = Result<T, PathError>;
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// Extension trait attaching a path to raw IO errors.
pub trait IoResultExt<T> {
    fn with_read_path(self, path: &std::path::Path) -> FileSystemResult<T>;
    fn with_write_path(self, path: &std::path::Path) -> FileSystemResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_read_path(self, path: &std::path::Path) -> FileSystemResult<T> {
        self.map_err(|source| FileSystemError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_write_path(self, path: &std::path::Path) -> FileSystemResult<T> {
        self.map_err(|source| FileSystemError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}
