use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// File name of the user configuration inside the plonk directory.
pub const CONFIG_FILE: &str = "plonk.yaml";

/// Ignore patterns applied even when the user configures none.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".DS_Store",
    ".git",
    ".git/**",
    "plonk.yaml",
    "plonk.lock",
    "*.bak",
];

/// Application configuration, read from `plonk.yaml` in the plonk directory.
///
/// Every field has a default; a missing config file yields the default
/// configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Manager used for unprefixed package specs.
    pub default_manager: String,

    /// Deadline for a full reconciliation pass, in seconds.
    pub reconcile_timeout_secs: u64,

    /// Deadline for a single install/uninstall/upgrade subprocess, in seconds.
    pub operation_timeout_secs: u64,

    /// Directories under the plonk dir whose contents are mapped file by file
    /// (e.g. `config` so that `config/nvim/init.lua` deploys to
    /// `~/.config/nvim/init.lua`).
    pub expand_directories: Vec<String>,

    /// Glob patterns for source-relative paths to skip when scanning the
    /// plonk directory. Extends the built-in defaults.
    pub ignore_patterns: Vec<String>,

    /// External diff command invoked by `plonk diff`. The drifted
    /// destination and its source are appended as the final two arguments.
    pub diff_tool: Vec<String>,

    /// Dotfile engine tunables.
    pub dotfiles: DotfilesConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DotfilesConfig {
    /// Rename an existing destination to `<path>.bak` before overwriting it.
    pub backup: bool,

    /// How many levels below an expanded directory root the scan descends.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_manager: "brew".to_string(),
            reconcile_timeout_secs: 30,
            operation_timeout_secs: 300,
            expand_directories: vec!["config".to_string()],
            ignore_patterns: Vec::new(),
            diff_tool: vec![
                "git".to_string(),
                "diff".to_string(),
                "--no-index".to_string(),
            ],
            dotfiles: DotfilesConfig::default(),
        }
    }
}

impl Default for DotfilesConfig {
    fn default() -> Self {
        Self {
            backup: false,
            max_depth: 2,
        }
    }
}

impl Config {
    /// Loads the configuration from `plonk.yaml` inside `plonk_dir`.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file exists but cannot be read.
    /// * [`ConfigError::Parse`] if the file is not valid YAML for this schema.
    pub fn load(plonk_dir: &Path) -> Result<Self> {
        let path = plonk_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        Ok(config)
    }

    /// Checks `default_manager` against the set of known manager names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDefaultManager`] when the configured
    /// name is not registered.
    pub fn validate_default_manager(&self, known: &[&str]) -> Result<()> {
        if known.contains(&self.default_manager.as_str()) {
            Ok(())
        } else {
            Err(ConfigError::UnknownDefaultManager(
                self.default_manager.clone(),
            ))
        }
    }

    /// Whether a source-relative path matches the configured or built-in
    /// ignore patterns.
    pub fn is_ignored(&self, relative: &str) -> bool {
        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        DEFAULT_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(self.ignore_patterns.iter().map(String::as_str))
            .any(|pattern| {
                fast_glob::glob_match(pattern, relative) || fast_glob::glob_match(pattern, file_name)
            })
    }

    /// Whether `first_component` is configured for file-by-file expansion.
    pub fn expands(&self, first_component: &str) -> bool {
        self.expand_directories
            .iter()
            .any(|dir| dir == first_component)
    }

    /// The configured diff tool, falling back to `git diff --no-index` when
    /// the user configured an empty list.
    pub fn diff_command(&self) -> Vec<String> {
        if self.diff_tool.is_empty() {
            Config::default().diff_tool
        } else {
            self.diff_tool.clone()
        }
    }

    /// Path of the config file inside `plonk_dir`.
    pub fn path(plonk_dir: &Path) -> PathBuf {
        plonk_dir.join(CONFIG_FILE)
    }
}
