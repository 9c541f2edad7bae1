//! [cargo install](https://doc.rust-lang.org/cargo/commands/cargo-install.html)
//! binaries.

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

pub struct Cargo {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Cargo {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "could not find")
            .with(ErrorClass::Build, "could not compile")
            .with(ErrorClass::Build, "failed to compile")
            .with(ErrorClass::NotInstalled, "package id specification");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Cargo {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Rust (which provides cargo) from https://rustup.rs"
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "cargo", &["install", "--list"])
            .await?;
        Ok(parse::cargo_installed(&out)
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Install, name, "cargo", &["install", name])
            .await
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(token, PmOp::Uninstall, name, "cargo", &["uninstall", name])
            .await
    }

    /// `cargo install` reinstalls the latest published version, which is
    /// cargo's upgrade story.
    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let names = if names.is_empty() {
            self.list_installed(token).await?
        } else {
            names.to_vec()
        };
        for name in &names {
            self.run_classified(token, PmOp::Upgrade, name, "cargo", &["install", name])
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
            .execute(token, "cargo", &["install", "--list"])
            .await?;
        parse::cargo_installed(&out)
            .into_iter()
            .find(|(installed, _)| installed == name)
            .map(|(_, version)| version)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "cargo".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let installed_version = self.installed_version(token, name).await.ok();
        let out = self
            .runner
            .execute(token, "cargo", &["search", name, "--limit", "1"])
            .await
            .unwrap_or_default();

        // `serde = "1.0.200"    # A serialization framework`
        let (version, description) = out
            .lines()
            .next()
            .filter(|line| line.split_whitespace().next() == Some(name))
            .map(|line| {
                let version = line
                    .split('"')
                    .nth(1)
                    .map(ToString::to_string);
                let description = line
                    .split('#')
                    .nth(1)
                    .map(|desc| desc.trim().to_string());
                (version, description)
            })
            .unwrap_or((None, None));

        Ok(PackageInfo {
            name: name.to_string(),
            version: installed_version.clone().or(version),
            description,
            homepage: None,
            dependencies: Vec::new(),
            installed: installed_version.is_some(),
            manager: "cargo".into(),
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "cargo", &["search", query])
            .await?;
        Ok(parse::cargo_search_names(&out))
    }
}

#[cfg(test)]
mod tests {
    use crate::exec::FakeRunner;

    use super::*;

    const LIST: &str = "ripgrep v14.1.0:\n    rg\ncargo-edit v0.12.2:\n    cargo-add\n";

    #[tokio::test]
    async fn test_list_and_version() {
        let pm = Cargo::new(Arc::new(
            FakeRunner::new()
                .with_binary("cargo")
                .on("cargo install --list", LIST),
        ));
        let token = CancellationToken::new();
        assert_eq!(
            pm.list_installed(&token).await.unwrap(),
            vec!["ripgrep", "cargo-edit"]
        );
        assert_eq!(
            pm.installed_version(&token, "ripgrep").await.unwrap(),
            "14.1.0"
        );
    }

    #[tokio::test]
    async fn test_build_failure_classified() {
        let pm = Cargo::new(Arc::new(FakeRunner::new().with_binary("cargo").on_code(
            "cargo install broken",
            "error[E0308]: mismatched types\nerror: could not compile `broken`",
            101,
        )));
        let token = CancellationToken::new();
        match pm.install(&token, "broken").await.unwrap_err() {
            ManagerError::Install { class, .. } => assert_eq!(class, ErrorClass::Build),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upgrade_empty_reinstalls_everything() {
        let runner = Arc::new(
            FakeRunner::new()
                .with_binary("cargo")
                .on("cargo install --list", LIST)
                .on("cargo install ripgrep", "")
                .on("cargo install cargo-edit", ""),
        );
        let pm = Cargo::new(runner.clone());
        let token = CancellationToken::new();
        pm.upgrade(&token, &[]).await.unwrap();
        assert!(runner.calls().contains(&"cargo install ripgrep".to_string()));
        assert!(runner
            .calls()
            .contains(&"cargo install cargo-edit".to_string()));
    }
}
