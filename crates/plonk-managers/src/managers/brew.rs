//! The [Homebrew package manager](https://brew.sh/).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{PackageManager, PmOp};
use crate::{
    error::{ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::CommandRunner,
    parse,
    types::{HealthCheck, PackageInfo},
};

pub struct Brew {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Brew {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "no available formula")
            .with(ErrorClass::NotFound, "no available cask")
            .with(ErrorClass::NotFound, "no formulae or casks found")
            .with(ErrorClass::NotInstalled, "no such keg")
            .with(ErrorClass::Dependency, "because it is required by");
        Self { runner, matcher }
    }

    async fn info_json(
        &self,
        token: &CancellationToken,
        args: &[&str],
    ) -> ManagerResult<parse::BrewInfoResponse> {
        let out = self.runner.execute(token, "brew", args).await?;
        serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
            manager: "brew".into(),
            operation: "info".into(),
            source,
        })
    }
}

#[async_trait]
impl PackageManager for Brew {
    fn name(&self) -> &'static str {
        "brew"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Homebrew from https://brew.sh"
    }

    /// Prefers the JSON inventory, which covers formulae, their aliases
    /// and casks in one invocation; falls back to `brew list`.
    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        match self
            .runner
            .execute(token, "brew", &["info", "--installed", "--json=v2"])
            .await
        {
            Ok(out) => match parse::brew_json_names(&out) {
                Ok(names) => Ok(names),
                Err(_) => {
                    let out = self.runner.execute(token, "brew", &["list"]).await?;
                    Ok(parse::first_token_names(&out))
                }
            },
            Err(err) if err.exit_code().is_some() => {
                let out = self.runner.execute(token, "brew", &["list"]).await?;
                Ok(parse::first_token_names(&out))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "brew", &["install", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Uninstall, name, "brew", &["uninstall", name])
            .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let mut args = vec!["upgrade"];
        args.extend(names.iter().map(String::as_str));
        let display = if names.is_empty() {
            "all".to_string()
        } else {
            names.join(", ")
        };
        self.run_classified(token, PmOp::Upgrade, &display, "brew", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self
            .runner
            .execute(token, "brew", &["list", "--versions", name])
            .await?;
        // `brew list --versions jq` -> "jq 1.7.1"
        out.split_whitespace()
            .nth(1)
            .map(ToString::to_string)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "brew".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let response = self.info_json(token, &["info", "--json=v2", name]).await?;

        if let Some(formula) = response.formulae.first() {
            return Ok(PackageInfo {
                name: formula.name.clone(),
                version: formula
                    .versions
                    .as_ref()
                    .and_then(|v| v.stable.clone())
                    .or_else(|| formula.installed.first().map(|i| i.version.clone())),
                description: formula.desc.clone(),
                homepage: formula.homepage.clone(),
                dependencies: formula.dependencies.clone(),
                installed: !formula.installed.is_empty(),
                manager: "brew".into(),
            });
        }
        if let Some(cask) = response.casks.first() {
            return Ok(PackageInfo {
                name: cask.token.clone(),
                version: cask.installed.clone(),
                description: cask.desc.clone(),
                homepage: cask.homepage.clone(),
                dependencies: Vec::new(),
                installed: cask.installed.is_some(),
                manager: "brew".into(),
            });
        }
        Err(ManagerError::NotFound {
            manager: "brew".into(),
            package: name.into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self.runner.execute(token, "brew", &["search", query]).await?;
        Ok(parse::first_token_names(&out))
    }

    /// Adds the brew bin directory (from `brew --prefix`) to the report.
    async fn check_health(&self, token: &CancellationToken) -> ManagerResult<HealthCheck> {
        if !self.is_available(token).await? {
            return Ok(
                HealthCheck::warn("brew", "package-managers", "not available")
                    .with_suggestion(self.install_hint()),
            );
        }

        let mut check = HealthCheck::pass("brew", "package-managers", "available");
        if let Ok(prefix) = self.runner.execute(token, "brew", &["--prefix"]).await {
            check = check.with_detail(format!("bin directory: {}/bin", prefix.trim()));
        }
        Ok(check)
    }

    /// Runs the official install script.
    async fn self_install(&self, token: &CancellationToken) -> ManagerResult<()> {
        if self.is_available(token).await? {
            return Ok(());
        }
        self.runner
            .execute_combined(
                token,
                "/bin/bash",
                &[
                    "-c",
                    "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)",
                ],
            )
            .await?;
        Ok(())
    }
}
