//! [RubyGems](https://rubygems.org/) via the `gem` CLI.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{PackageManager, PmOp};
use crate::{
    error::{ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::{CommandError, CommandRunner},
    parse,
    types::PackageInfo,
};

/// Stderr fragments that mean `--user-install` itself is the problem and
/// the install should be retried without it.
const USER_INSTALL_RETRY: &[&str] = &["use --install-dir", "dir_mode", "--user-install"];

pub struct Gem {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Gem {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "could not find a valid gem")
            .with(ErrorClass::NotInstalled, "is not installed")
            .with(ErrorClass::Build, "failed to build gem native extension");
        Self { runner, matcher }
    }
}

#[async_trait]
impl PackageManager for Gem {
    fn name(&self) -> &'static str {
        "gem"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Ruby (which provides gem) from https://www.ruby-lang.org"
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "gem", &["list", "--local"])
            .await?;
        Ok(parse::gem_list_names(&out))
    }

    /// Tries `--user-install` first; retries without it when the failure
    /// output blames the user install dir.
    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        match self
            .runner
            .execute_combined(token, "gem", &["install", "--user-install", name])
            .await
        {
            Ok(_) => Ok(()),
            Err(CommandError::ExitStatus { output, .. }) => {
                let lowered = output.to_lowercase();
                if USER_INSTALL_RETRY
                    .iter()
                    .any(|fragment| lowered.contains(fragment))
                {
                    return self
                        .run_classified(token, PmOp::Install, name, "gem", &["install", name])
                        .await;
                }

                let class = self.matcher.classify(&output);
                match class {
                    ErrorClass::AlreadyInstalled => Ok(()),
                    ErrorClass::NotFound => Err(ManagerError::NotFound {
                        manager: "gem".into(),
                        package: name.into(),
                    }),
                    _ => Err(self.classified_error(PmOp::Install, name, class, &output)),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn uninstall(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        self.run_classified(
            token,
            PmOp::Uninstall,
            name,
            "gem",
            &["uninstall", "-x", name],
        )
        .await
    }

    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let mut args = vec!["update"];
        args.extend(names.iter().map(String::as_str));
        let display = if names.is_empty() {
            "all".to_string()
        } else {
            names.join(", ")
        };
        self.run_classified(token, PmOp::Upgrade, &display, "gem", &args)
            .await
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let out = self
            .runner
            .execute(token, "gem", &["list", "--local", "--exact", name])
            .await?;
        // `rake (13.1.0, 13.0.6)` -> newest listed first
        out.lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split(['(', ',', ')']).nth(1))
            .map(|version| version.trim().to_string())
            .filter(|version| !version.is_empty())
            .ok_or_else(|| ManagerError::NotFound {
                manager: "gem".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let version = self.installed_version(token, name).await.ok();
        Ok(PackageInfo {
            name: name.to_string(),
            installed: version.is_some(),
            version,
            manager: "gem".into(),
            ..Default::default()
        })
    }

    async fn search(&self, token: &CancellationToken, query: &str) -> ManagerResult<Vec<String>> {
        let out = self
            .runner
            .execute(token, "gem", &["search", query])
            .await?;
        Ok(parse::gem_list_names(&out))
    }
}
