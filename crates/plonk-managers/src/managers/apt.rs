//! The [APT](https://wiki.debian.org/Apt) package manager. Linux only.

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

pub struct Apt {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Apt {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "unable to locate package")
            .with(ErrorClass::Locked, "could not get lock")
            .with(ErrorClass::Permission, "are you root")
            .with(ErrorClass::Dependency, "unmet dependencies");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Apt {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "apt is only available on Debian-based Linux systems"
    }

    async fn is_available(&self, token: &CancellationToken) -> ManagerResult<bool> {
        if !cfg!(target_os = "linux") {
            return Ok(false);
        }
        if self.runner.look_path("apt").is_none() {
            return Ok(false);
        }
        match self.runner.execute(token, "apt", &["--version"]).await {
            Ok(_) => Ok(true),
            Err(crate::exec::CommandError::Cancelled) => {
                Err(crate::exec::CommandError::Cancelled.into())
            }
            Err(_) => Ok(false),
        }
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "apt", &["list", "--installed"])
            .await?;
        Ok(parse::apt_installed_names(&out))
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Install,
            name,
            "apt-get",
            &["install", "-y", name],
        )
        .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            "apt-get",
            &["remove", "-y", name],
        )
        .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        if names.is_empty() {
            return self
                .run_classified(token, PmOp::Upgrade, "all", "apt-get", &["upgrade", "-y"])
                .await;
        }
        let mut args = vec!["install", "-y", "--only-upgrade"];
        args.extend(names.iter().map(String::as_str));
        self.run_classified(token, PmOp::Upgrade, &names.join(", "), "apt-get", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self.runner.execute(token, "apt", &["show", name]).await?;
        out.lines()
            .find_map(|line| line.strip_prefix("Version:"))
            .map(|version| version.trim().to_string())
            .ok_or_else(|| ManagerError::NotFound {
                manager: "apt".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let out = self.runner.execute(token, "apt", &["show", name]).await?;
        let field = |prefix: &str| {
            out.lines()
                .find_map(|line| line.strip_prefix(prefix))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let installed = self.is_installed(token, name).await.unwrap_or(false);
        Ok(PackageInfo {
            name: name.to_string(),
            version: field("Version:"),
            description: field("Description:"),
            homepage: field("Homepage:"),
            dependencies: field("Depends:")
                .map(|depends| {
                    depends
                        .split(',')
                        .filter_map(|dep| dep.split_whitespace().next())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            installed,
            manager: "apt".into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "apt", &["search", query])
            .await?;
        // `jq/stable 1.7.1-1 amd64` with a wrapped description line after
        Ok(parse::clean_lines(&out)
            .into_iter()
            .filter(|line| line.contains('/'))
            .filter_map(|line| line.split('/').next())
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::exec::FakeRunner;

    use super::*;

    #[tokio::test]
    #[cfg_attr(not(target_os = "linux"), ignore = "apt adapter is linux-only")]
    async fn test_list_installed_skips_banner() {
        let pm = Apt::new(Arc::new(FakeRunner::new().with_binary("apt").on(
            "apt list --installed",
            "Listing... Done\njq/stable,now 1.7.1-1 amd64 [installed]\nwget/stable,now 1.21 amd64 [installed]\n",
        )));
        let token = CancellationToken::new();
        assert_eq!(pm.list_installed(&token).await.unwrap(), vec!["jq", "wget"]);
    }

    #[tokio::test]
    async fn test_locked_dpkg_classified() {
        let pm = Apt::new(Arc::new(FakeRunner::new().with_binary("apt-get").on_code(
            "apt-get install -y jq",
            "E: Could not get lock /var/lib/dpkg/lock-frontend",
            100,
        )));
        let token = CancellationToken::new();
        match pm.install(&token, "jq").await.unwrap_err() {
            ManagerError::Install { class, .. } => assert_eq!(class, ErrorClass::Locked),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_off_linux_or_missing() {
        let pm = Apt::new(Arc::new(FakeRunner::new()));
        let token = CancellationToken::new();
        assert!(!pm.is_available(&token).await.unwrap());
    }
}
