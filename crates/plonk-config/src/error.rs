use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}'")]
    #[diagnostic(
        code(plonk_config::read),
        help("Check if the file exists and you have read permissions")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    #[diagnostic(
        code(plonk_config::parse),
        help("Check your plonk.yaml syntax and structure")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unknown default manager '{0}'")]
    #[diagnostic(
        code(plonk_config::unknown_default_manager),
        help("Set default_manager to one of the supported package managers")
    )]
    UnknownDefaultManager(String),

    #[error("Invalid ignore pattern '{0}'")]
    #[diagnostic(
        code(plonk_config::invalid_ignore_pattern),
        help("Ignore patterns are glob expressions evaluated against source-relative paths")
    )]
    InvalidIgnorePattern(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
