//! The [npm](https://www.npmjs.com/) global package space.
//!
//! Scoped names (`@scope/pkg`) are preserved verbatim through every
//! operation.

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

pub struct Npm {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Npm {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "e404")
            .with(ErrorClass::NotFound, "404 not found")
            .with(ErrorClass::Network, "enetunreach")
            .with(ErrorClass::Network, "econnreset")
            .with(ErrorClass::Permission, "eperm");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Npm {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Node.js (which provides npm) from https://nodejs.org"
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "npm", &["list", "-g", "--parseable", "--depth=0"])
            .await?;
        Ok(parse::npm_parseable_names(&out))
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "npm", &["install", "-g", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            "npm",
            &["uninstall", "-g", name],
        )
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
        self.run_classified(token, PmOp::Upgrade, &display, "npm", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self
            .runner
            .execute(token, "npm", &["list", "-g", "--depth=0", "--json", name])
            .await?;
        let value: serde_json::Value =
            serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
                manager: "npm".into(),
                operation: "installed-version".into(),
                source,
            })?;
        value["dependencies"][name]["version"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "npm".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let out = self
            .runner
            .execute(token, "npm", &["view", name, "--json"])
            .await?;
        let value: serde_json::Value =
            serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
                manager: "npm".into(),
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
            manager: "npm".into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "npm", &["search", query, "--parseable"])
            .await?;
        // tab-separated: name, description, maintainer, ...
        Ok(parse::clean_lines(&out)
            .into_iter()
            .filter_map(|line| line.split('\t').next())
            .map(ToString::to_string)
            .collect())
    }
}
