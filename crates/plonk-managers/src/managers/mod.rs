//! The uniform package manager contract and one adapter per backend.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{truncate_output, ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::{CommandError, CommandRunner},
    types::{HealthCheck, PackageInfo},
};

pub mod apt;
pub mod brew;
pub mod cargo;
pub mod conda;
pub mod gem;
pub mod go;
pub mod npm;
pub mod pip;
pub mod pipx;
pub mod pnpm;
pub mod uv;

/// Mutating operations, for error wrapping and success-policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmOp {
    Install,
    Uninstall,
    Upgrade,
}

/// Cap on subprocess output carried in failure messages.
const OUTPUT_LIMIT: usize = 500;

/// Uniform contract over one external package manager CLI.
///
/// Adapters depend only on the [`CommandRunner`] seam; they never reach
/// into the lock service or the orchestrator.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Registry name, e.g. `"brew"`.
    fn name(&self) -> &'static str;

    /// Binary probed on PATH; usually the registry name.
    fn binary(&self) -> &'static str {
        self.name()
    }

    fn runner(&self) -> &dyn CommandRunner;

    /// Output classifier with this manager's patterns layered over the
    /// baseline.
    fn matcher(&self) -> &ErrorMatcher;

    /// One-line suggestion shown when this manager is missing.
    fn install_hint(&self) -> &'static str;

    /// Managers that must be installed before this one can self-install.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Arguments of a cheap functional probe, run by `is_available`.
    fn probe_args(&self) -> &'static [&'static str] {
        &["--version"]
    }

    /// Name under which a requested package is recorded in the lock file.
    /// Managers whose install target differs from the installed name
    /// (go module paths) override this.
    fn lock_name(&self, requested: &str) -> String {
        requested.to_string()
    }

    /// Extra metadata recorded alongside the lock entry.
    fn lock_metadata(&self, requested: &str) -> Vec<(String, String)> {
        let _ = requested;
        Vec::new()
    }

    /// Whether the manager binary exists and responds.
    ///
    /// An absent or non-functional binary is `Ok(false)`, never an error;
    /// only cancellation propagates.
    async fn is_available(&self, token: &CancellationToken) -> ManagerResult<bool> {
        if self.runner().look_path(self.binary()).is_none() {
            return Ok(false);
        }
        match self
            .runner()
            .execute(token, self.binary(), self.probe_args())
            .await
        {
            Ok(_) => Ok(true),
            Err(CommandError::Cancelled) => Err(CommandError::Cancelled.into()),
            Err(_) => Ok(false),
        }
    }

    /// Names of every package this manager reports installed.
    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>>;

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()>;

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()>;

    async fn is_installed(&self, token: &CancellationToken, name: &str) -> ManagerResult<bool> {
        Ok(self
            .list_installed(token)
            .await?
            .iter()
            .any(|installed| installed == name))
    }

    /// Upgrades the given packages; an empty slice upgrades everything this
    /// manager has installed.
    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()>;

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String>;

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo>;

    /// Searches the manager's repository. Managers without a search
    /// command return [`ManagerError::Unsupported`] with a suggestion.
    async fn search(
        &self,
        token: &CancellationToken,
        query: &str,
    ) -> ManagerResult<Vec<String>> {
        let _ = (token, query);
        Err(self.unsupported("search"))
    }

    /// Health probe; never fatal. An absent binary is a warning.
    async fn check_health(&self, token: &CancellationToken) -> ManagerResult<HealthCheck> {
        if self.is_available(token).await? {
            Ok(
                HealthCheck::pass(self.name(), "package-managers", "available")
                    .with_detail(format!("binary: {}", self.binary())),
            )
        } else {
            Ok(
                HealthCheck::warn(self.name(), "package-managers", "not available")
                    .with_suggestion(self.install_hint()),
            )
        }
    }

    /// Installs the manager itself. Idempotent; a no-op when already
    /// available.
    async fn self_install(&self, token: &CancellationToken) -> ManagerResult<()> {
        if self.is_available(token).await? {
            return Ok(());
        }
        Err(self.unsupported("self-install"))
    }

    /// The error reported when an operation targets this manager while it
    /// is not available.
    fn unavailable(&self) -> ManagerError {
        ManagerError::Unavailable {
            manager: self.name().to_string(),
            suggestion: self.install_hint().to_string(),
        }
    }

    fn unsupported(&self, operation: &str) -> ManagerError {
        ManagerError::Unsupported {
            manager: self.name().to_string(),
            operation: operation.to_string(),
            suggestion: self.install_hint().to_string(),
        }
    }

    /// Runs a mutating command and applies the shared success policy:
    /// installing an already-installed package, uninstalling a package that
    /// is not installed, and upgrading with nothing to do all count as
    /// success. Other non-zero exits become a classified error carrying the
    /// first bytes of combined output.
    async fn run_classified(
        &self,
        token: &CancellationToken,
        op: PmOp,
        package: &str,
        program: &str,
        args: &[&str],
    ) -> ManagerResult<()> {
        match self.runner().execute_combined(token, program, args).await {
            Ok(_) => Ok(()),
            Err(CommandError::ExitStatus { output, .. }) => {
                let class = self.matcher().classify(&output);
                match (op, class) {
                    (PmOp::Install, ErrorClass::AlreadyInstalled) => Ok(()),
                    (PmOp::Uninstall, ErrorClass::NotInstalled) => Ok(()),
                    (PmOp::Upgrade, ErrorClass::AlreadyInstalled) => Ok(()),
                    (PmOp::Install, ErrorClass::NotFound) => Err(ManagerError::NotFound {
                        manager: self.name().to_string(),
                        package: package.to_string(),
                    }),
                    _ => Err(self.classified_error(op, package, class, &output)),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn classified_error(
        &self,
        op: PmOp,
        package: &str,
        class: ErrorClass,
        output: &str,
    ) -> ManagerError {
        let manager = self.name().to_string();
        let package = package.to_string();
        let details = truncate_output(output, OUTPUT_LIMIT);
        match op {
            PmOp::Install => ManagerError::Install {
                manager,
                package,
                class,
                details,
            },
            PmOp::Uninstall => ManagerError::Uninstall {
                manager,
                package,
                class,
                details,
            },
            PmOp::Upgrade => ManagerError::Upgrade {
                manager,
                package,
                class,
                details,
            },
        }
    }
}

impl std::fmt::Debug for dyn PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManager")
            .field("name", &self.name())
            .finish()
    }
}
