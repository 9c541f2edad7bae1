use miette::Diagnostic;
use plonk_config::error::ConfigError;
use plonk_core::CoreError;
use plonk_managers::{CommandError, ManagerError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum OpsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manager(#[from] ManagerError),

    #[error("Reconciliation of the {domain} domain timed out after {seconds}s")]
    #[diagnostic(
        code(plonk::reconciliation),
        help("A package manager may be hanging; raise reconcile_timeout_secs if this recurs")
    )]
    Timeout { domain: String, seconds: u64 },
}

impl OpsError {
    /// Process exit code for this error: 2 for configuration errors,
    /// 3 for missing resources, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(CoreError::InvalidSpec { .. }) => 2,
            Self::Manager(ManagerError::UnknownManager { .. }) => 2,
            Self::Core(CoreError::FileNotFound { .. }) => 3,
            Self::Manager(ManagerError::NotFound { .. }) => 3,
            _ => 1,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Manager(ManagerError::Command(CommandError::Cancelled))
        )
    }
}

pub type OpsResult<T> = Result<T, OpsError>;
