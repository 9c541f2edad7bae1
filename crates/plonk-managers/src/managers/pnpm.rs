//! The [pnpm](https://pnpm.io/) global package space.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{PackageManager, PmOp};
use crate::{
    error::{ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::CommandRunner,
    parse,
    types::PackageInfo,
};

pub struct Pnpm {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Pnpm {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "err_pnpm_fetch_404")
            .with(ErrorClass::NotFound, "404 not found")
            .with(ErrorClass::Network, "err_pnpm_meta_fetch_fail");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Pnpm {
    fn name(&self) -> &'static str {
        "pnpm"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install pnpm from https://pnpm.io/installation, or run 'npm install -g pnpm'"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["npm"]
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "pnpm", &["list", "-g", "--parseable", "--depth=0"])
            .await?;
        Ok(parse::npm_parseable_names(&out))
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "pnpm", &["add", "-g", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Uninstall, name, "pnpm", &["remove", "-g", name])
            .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let mut args = vec!["update", "-g"];
        args.extend(names.iter().map(String::as_str));
        let display = if names.is_empty() {
            "all".to_string()
        } else {
            names.join(", ")
        };
        self.run_classified(token, PmOp::Upgrade, &display, "pnpm", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self
            .runner
            .execute(token, "pnpm", &["list", "-g", "--depth=0", "--json", name])
            .await?;
        let value: serde_json::Value =
            serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
                manager: "pnpm".into(),
                operation: "installed-version".into(),
                source,
            })?;
        // pnpm wraps the project list in an array
        let root = value.get(0).unwrap_or(&value);
        root["dependencies"][name]["version"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "pnpm".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let out = self
            .runner
            .execute(token, "pnpm", &["view", name, "--json"])
            .await?;
        let value: serde_json::Value =
            serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
                manager: "pnpm".into(),
                operation: "info".into(),
                source,
            })?;

        let installed = self.is_installed(token, name).await.unwrap_or(false);
        Ok(PackageInfo {
            name: name.to_string(),
            version: value["version"].as_str().map(ToString::to_string),
            description: value["description"].as_str().map(ToString::to_string),
            homepage: value["homepage"].as_str().map(ToString::to_string),
            dependencies: value["dependencies"]
                .as_object()
                .map(|deps| deps.keys().cloned().collect())
                .unwrap_or_default(),
            installed,
            manager: "pnpm".into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let _ = (token, query);
        Err(self.unsupported("search"))
    }

    /// Installs pnpm through npm when npm is present.
    async fn self_install(&self, token: &CancellationToken) -> ManagerResult<()> {
        if self.is_available(token).await? {
            return Ok(());
        }
        if self.runner.look_path("npm").is_none() {
            return Err(self.unavailable());
        }
        self.runner
            .execute_combined(token, "npm", &["install", "-g", "pnpm"])
            .await?;
        Ok(())
    }
}
