//! [pipx](https://pipx.pypa.io/), for Python applications in isolated
//! environments.

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

pub struct Pipx {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Pipx {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::AlreadyInstalled, "already seems to be installed")
            .with(ErrorClass::NotInstalled, "nothing to uninstall")
            .with(ErrorClass::NotFound, "no matching distribution");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Pipx {
    fn name(&self) -> &'static str {
        "pipx"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install pipx with 'pip install --user pipx'"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["pip"]
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "pipx", &["list", "--short"])
            .await?;
        Ok(parse::name_version_pairs(&out)
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "pipx", &["install", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Uninstall, name, "pipx", &["uninstall", name])
            .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        if names.is_empty() {
            return self
                .run_classified(token, PmOp::Upgrade, "all", "pipx", &["upgrade-all"])
                .await;
        }
        for name in names {
            self.run_classified(token, PmOp::Upgrade, name, "pipx", &["upgrade", name])
                .await?;
        }
        Ok(())
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self
            .runner
            .execute(token, "pipx", &["list", "--short"])
            .await?;
        let wanted = parse::normalize_py_name(name);
        parse::name_version_pairs(&out)
            .into_iter()
            .find(|(installed, _)| parse::normalize_py_name(installed) == wanted)
            .map(|(_, version)| version)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "pipx".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let version = self.installed_version(token, name).await.ok();
        Ok(PackageInfo {
            name: name.to_string(),
            installed: version.is_some(),
            version,
            manager: "pipx".into(),
            ..Default::default()
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let _ = (token, query);
        Err(ManagerError::Unsupported {
            manager: "pipx".into(),
            operation: "search".into(),
            suggestion: "Search PyPI directly at https://pypi.org/search".into(),
        })
    }

    async fn self_install(&self, token: &CancellationToken) -> ManagerResult<()> {
        if self.is_available(token).await? {
            return Ok(());
        }
        if self.runner.look_path("pip").is_none() && self.runner.look_path("pip3").is_none() {
            return Err(self.unavailable());
        }
        let pip = if self.runner.look_path("pip").is_some() {
            "pip"
        } else {
            "pip3"
        };
        self.runner
            .execute_combined(token, pip, &["install", "--user", "pipx"])
            .await?;
        Ok(())
    }
}
