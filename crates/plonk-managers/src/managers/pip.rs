//! The [pip](https://pip.pypa.io/) Python package installer.
//!
//! Names are compared in normalized form (lowercase, `_` and `.` folded
//! to `-`), matching how PyPI treats them.

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

pub struct Pip {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Pip {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(
                ErrorClass::NotFound,
                "could not find a version that satisfies",
            )
            .with(ErrorClass::NotFound, "no matching distribution")
            .with(ErrorClass::NotInstalled, "not installed")
            .with(ErrorClass::Build, "failed building wheel");
        Self { runner, matcher }
    }

    /// Primary binary is `pip`; systems that only ship `pip3` fall back.
    fn bin(&self) -> &'static str {
        if self.runner.look_path("pip").is_some() {
            "pip"
        } else {
            "pip3"
        }
    }
}

#[async_trait]
impl PackageManager for Pip {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn binary(&self) -> &'static str {
        self.bin()
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Python (which provides pip) from https://www.python.org"
    }

    /// Tries `--user --format=json`, then `--user` plain text, then a
    /// bare `pip list`.
    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let bin = self.bin();

        if let Ok(out) = self
            .runner
            .execute(token, bin, &["list", "--user", "--format=json"])
            .await
        {
            if let Ok(names) = parse::pip_json_names(&out) {
                return Ok(names);
            }
        }
        if token.is_cancelled() {
            return Err(crate::exec::CommandError::Cancelled.into());
        }

        if let Ok(out) = self.runner.execute(token, bin, &["list", "--user"]).await {
            return Ok(parse::pip_plain_names(&out));
        }
        if token.is_cancelled() {
            return Err(crate::exec::CommandError::Cancelled.into());
        }

        let out = self.runner.execute(token, bin, &["list"]).await?;
        Ok(parse::pip_plain_names(&out))
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Install,
            name,
            self.bin(),
            &["install", "--user", name],
        )
        .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            self.bin(),
            &["uninstall", "-y", name],
        )
        .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let names = if names.is_empty() {
            self.list_installed(token).await?
        } else {
            names.to_vec()
        };
        if names.is_empty() {
            return Ok(());
        }
        let mut args = vec!["install", "--user", "--upgrade"];
        args.extend(names.iter().map(String::as_str));
        self.run_classified(token, PmOp::Upgrade, &names.join(", "), self.bin(), &args)
            .await
    }

    async fn is_installed(&self, token: &CancellationToken, name: &str) -> ManagerResult<bool> {
        let wanted = parse::normalize_py_name(name);
        Ok(self
            .list_installed(token)
            .await?
            .iter()
            .any(|installed| parse::normalize_py_name(installed) == wanted))
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self.runner.execute(token, self.bin(), &["show", name]).await?;
        out.lines()
            .find_map(|line| line.strip_prefix("Version:"))
            .map(|version| version.trim().to_string())
            .ok_or_else(|| ManagerError::NotFound {
                manager: "pip".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let out = self.runner.execute(token, self.bin(), &["show", name]).await?;
        let field = |prefix: &str| {
            out.lines()
                .find_map(|line| line.strip_prefix(prefix))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(PackageInfo {
            name: field("Name:").unwrap_or_else(|| name.to_string()),
            version: field("Version:"),
            description: field("Summary:"),
            homepage: field("Home-page:"),
            dependencies: field("Requires:")
                .map(|requires| {
                    requires
                        .split(',')
                        .map(|dep| dep.trim().to_string())
                        .filter(|dep| !dep.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            installed: true,
            manager: "pip".into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let _ = (token, query);
        // PyPI disabled `pip search` server-side
        Err(ManagerError::Unsupported {
            manager: "pip".into(),
            operation: "search".into(),
            suggestion: "Search PyPI directly at https://pypi.org/search".into(),
        })
    }
}
