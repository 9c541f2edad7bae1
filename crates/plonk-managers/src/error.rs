//! Classified errors for package manager operations.
//!
//! Package manager CLIs overload their exit codes, so failures are
//! classified by matching the lowercased combined output against
//! substring pattern tables: a per-manager table first, then a shared
//! baseline.

use miette::Diagnostic;
use thiserror::Error;

use crate::exec::CommandError;

/// What a failed manager invocation most likely means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    AlreadyInstalled,
    NotInstalled,
    Permission,
    Locked,
    Network,
    Build,
    Dependency,
    Unknown,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::AlreadyInstalled => "already installed",
            Self::NotInstalled => "not installed",
            Self::Permission => "permission denied",
            Self::Locked => "database locked",
            Self::Network => "network failure",
            Self::Build => "build failure",
            Self::Dependency => "dependency conflict",
            Self::Unknown => "unknown failure",
        };
        f.write_str(name)
    }
}

/// Pure output classifier.
///
/// Patterns are matched as lowercase substrings in insertion order, so
/// manager-specific patterns added with [`ErrorMatcher::with`] take
/// precedence over the baseline.
#[derive(Debug, Clone)]
pub struct ErrorMatcher {
    patterns: Vec<(ErrorClass, &'static str)>,
}

impl ErrorMatcher {
    /// A matcher with only the shared baseline patterns.
    pub fn baseline() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Adds a manager-specific pattern, matched before the baseline.
    pub fn with(mut self, class: ErrorClass, pattern: &'static str) -> Self {
        self.patterns.push((class, pattern));
        self
    }

    /// Classifies combined subprocess output.
    pub fn classify(&self, output: &str) -> ErrorClass {
        let haystack = output.to_lowercase();
        for (class, pattern) in self.patterns.iter().chain(BASELINE.iter()) {
            if haystack.contains(pattern) {
                return *class;
            }
        }
        ErrorClass::Unknown
    }
}

const BASELINE: &[(ErrorClass, &'static str)] = &[
    (ErrorClass::AlreadyInstalled, "already installed"),
    (ErrorClass::AlreadyInstalled, "already up-to-date"),
    (ErrorClass::AlreadyInstalled, "already up to date"),
    (ErrorClass::AlreadyInstalled, "nothing to upgrade"),
    (ErrorClass::AlreadyInstalled, "nothing to update"),
    (ErrorClass::NotInstalled, "is not installed"),
    (ErrorClass::NotInstalled, "not currently installed"),
    (ErrorClass::NotFound, "not found"),
    (ErrorClass::NotFound, "could not find"),
    (ErrorClass::NotFound, "unable to locate"),
    (ErrorClass::NotFound, "no matching"),
    (ErrorClass::Permission, "permission denied"),
    (ErrorClass::Permission, "operation not permitted"),
    (ErrorClass::Permission, "eacces"),
    (ErrorClass::Locked, "could not get lock"),
    (ErrorClass::Locked, "database is locked"),
    (ErrorClass::Locked, "resource temporarily unavailable"),
    (ErrorClass::Network, "connection refused"),
    (ErrorClass::Network, "connection reset"),
    (ErrorClass::Network, "network is unreachable"),
    (ErrorClass::Network, "temporary failure in name resolution"),
    (ErrorClass::Network, "timed out"),
    (ErrorClass::Build, "build failed"),
    (ErrorClass::Build, "compilation failed"),
    (ErrorClass::Build, "could not compile"),
    (ErrorClass::Dependency, "required by"),
    (ErrorClass::Dependency, "depends on"),
    (ErrorClass::Dependency, "dependency conflict"),
];

/// Caps a failure message at the first `limit` bytes of output, on a char
/// boundary.
pub fn truncate_output(output: &str, limit: usize) -> String {
    if output.len() <= limit {
        return output.trim_end().to_string();
    }
    let mut end = limit;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    output[..end].trim_end().to_string()
}

#[derive(Error, Diagnostic, Debug)]
pub enum ManagerError {
    #[error("'{manager}' is not available on this system")]
    #[diagnostic(code(plonk::manager_unavailable), help("{suggestion}"))]
    Unavailable {
        manager: String,
        suggestion: String,
    },

    #[error("Unknown package manager '{name}'")]
    #[diagnostic(
        code(plonk::unknown_manager),
        help("Run 'plonk managers' to list the supported package managers")
    )]
    UnknownManager { name: String },

    #[error("Package '{package}' not found by {manager}")]
    #[diagnostic(
        code(plonk::package_not_found),
        help("Check the package name, or search with 'plonk search {manager}:{package}'")
    )]
    NotFound { manager: String, package: String },

    #[error("Failed to install '{package}' with {manager}: {class}")]
    #[diagnostic(code(plonk::package_install), help("{details}"))]
    Install {
        manager: String,
        package: String,
        class: ErrorClass,
        details: String,
    },

    #[error("Failed to uninstall '{package}' with {manager}: {class}")]
    #[diagnostic(code(plonk::package_uninstall), help("{details}"))]
    Uninstall {
        manager: String,
        package: String,
        class: ErrorClass,
        details: String,
    },

    #[error("Failed to upgrade '{package}' with {manager}: {class}")]
    #[diagnostic(code(plonk::package_upgrade), help("{details}"))]
    Upgrade {
        manager: String,
        package: String,
        class: ErrorClass,
        details: String,
    },

    #[error("{manager} does not support {operation}")]
    #[diagnostic(code(plonk::operation_not_supported), help("{suggestion}"))]
    Unsupported {
        manager: String,
        operation: String,
        suggestion: String,
    },

    #[error("Failed to parse {manager} output for {operation}")]
    #[diagnostic(code(plonk::command_execution))]
    Parse {
        manager: String,
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),
}

impl ManagerError {
    /// Whether this error is a cancellation, which callers must observe
    /// as-is instead of classifying it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Command(CommandError::Cancelled))
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_classification() {
        let matcher = ErrorMatcher::baseline();
        assert_eq!(
            matcher.classify("Error: Permission denied @ /usr/local"),
            ErrorClass::Permission
        );
        assert_eq!(
            matcher.classify("E: Could not get lock /var/lib/dpkg/lock"),
            ErrorClass::Locked
        );
        assert_eq!(
            matcher.classify("Warning: jq is already installed"),
            ErrorClass::AlreadyInstalled
        );
        assert_eq!(matcher.classify("gibberish"), ErrorClass::Unknown);
        assert_eq!(matcher.classify(""), ErrorClass::Unknown);
    }

    #[test]
    fn test_manager_patterns_take_precedence() {
        let matcher = ErrorMatcher::baseline().with(ErrorClass::NotFound, "no available formula");
        assert_eq!(
            matcher.classify("Error: No available formula with the name \"nope\""),
            ErrorClass::NotFound
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let matcher = ErrorMatcher::baseline();
        assert_eq!(
            matcher.classify("E: UNABLE TO LOCATE PACKAGE foo"),
            ErrorClass::NotFound
        );
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short", 500), "short");
        let long = "x".repeat(600);
        assert_eq!(truncate_output(&long, 500).len(), 500);
        // never splits a multi-byte char
        let multi = "é".repeat(300);
        let truncated = truncate_output(&multi, 501);
        assert!(truncated.len() <= 501);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
