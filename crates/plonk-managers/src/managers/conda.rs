//! The [conda](https://docs.conda.io/) package and environment manager.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{PackageManager, PmOp};
use crate::{
    error::{ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::CommandRunner,
    types::PackageInfo,
};

#[derive(Deserialize)]
struct CondaListEntry {
    name: String,
    version: String,
}

pub struct Conda {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Conda {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "packagesnotfounderror")
            .with(ErrorClass::NotFound, "packagenotinstallederror")
            .with(ErrorClass::Dependency, "unsatisfiableerror");
        Self { runner, matcher }
    }

    async fn list_entries(
        &self,
        token: &CancellationToken,
    ) -> ManagerResult<Vec<CondaListEntry>> {
        let out = self
            .runner
            .execute(token, "conda", &["list", "--json"])
            .await?;
        if out.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
            manager: "conda".into(),
            operation: "list".into(),
            source,
        })
    }
}

#[async_trait]
impl PackageManager for Conda {
    fn name(&self) -> &'static str {
        "conda"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Miniconda from https://docs.conda.io/projects/miniconda"
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        Ok(self
            .list_entries(token)
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "conda", &["install", "-y", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            "conda",
            &["remove", "-y", name],
        )
        .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        if names.is_empty() {
            return self
                .run_classified(token, PmOp::Upgrade, "all", "conda", &["update", "-y", "--all"])
                .await;
        }
        let mut args = vec!["update", "-y"];
        args.extend(names.iter().map(String::as_str));
        self.run_classified(token, PmOp::Upgrade, &names.join(", "), "conda", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        self.list_entries(token)
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.version)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "conda".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let version = self.installed_version(token, name).await.ok();
        Ok(PackageInfo {
            name: name.to_string(),
            installed: version.is_some(),
            version,
            manager: "conda".into(),
            ..Default::default()
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "conda", &["search", query, "--json"])
            .await?;
        let value: serde_json::Value =
            serde_json::from_str(out.trim()).map_err(|source| ManagerError::Parse {
                manager: "conda".into(),
                operation: "search".into(),
                source,
            })?;
        Ok(value
            .as_object()
            .map(|packages| packages.keys().cloned().collect())
            .unwrap_or_default())
    }
}
