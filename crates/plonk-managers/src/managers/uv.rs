//! [uv](https://docs.astral.sh/uv/) tool installs.

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

pub struct Uv {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Uv {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "no solution found")
            .with(ErrorClass::NotFound, "not found in the package registry")
            .with(ErrorClass::NotInstalled, "is not installed");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Uv {
    fn name(&self) -> &'static str {
        "uv"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install uv from https://docs.astral.sh/uv/getting-started/installation"
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self.runner.execute(token, "uv", &["tool", "list"]).await?;
        Ok(parse::name_version_pairs(&out)
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "uv", &["tool", "install", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            "uv",
            &["tool", "uninstall", name],
        )
        .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        if names.is_empty() {
            return self
                .run_classified(token, PmOp::Upgrade, "all", "uv", &["tool", "upgrade", "--all"])
                .await;
        }
        let mut args = vec!["tool", "upgrade"];
        args.extend(names.iter().map(String::as_str));
        self.run_classified(token, PmOp::Upgrade, &names.join(", "), "uv", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self.runner.execute(token, "uv", &["tool", "list"]).await?;
        let wanted = parse::normalize_py_name(name);
        parse::name_version_pairs(&out)
            .into_iter()
            .find(|(installed, _)| parse::normalize_py_name(installed) == wanted)
            .map(|(_, version)| version)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "uv".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let version = self.installed_version(token, name).await.ok();
        Ok(PackageInfo {
            name: name.to_string(),
            installed: version.is_some(),
            version,
            manager: "uv".into(),
            ..Default::default()
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let _ = (token, query);
        Err(ManagerError::Unsupported {
            manager: "uv".into(),
            operation: "search".into(),
            suggestion: "Search PyPI directly at https://pypi.org/search".into(),
        })
    }
}
