//! `go install` binaries.
//!
//! Go has no uninstall or list command; the installed set is the contents
//! of the go bin directory, filtered down to Go-built binaries by
//! `go version -m` succeeding on them.

use std::{
    env, fs,
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{PackageManager, PmOp};
use crate::{
    error::{ErrorClass, ErrorMatcher, ManagerError, ManagerResult},
    exec::{CommandError, CommandRunner},
    types::PackageInfo,
};

pub struct Go {
    runner: Arc<dyn CommandRunner>,
    matcher: ErrorMatcher,
}

impl Go {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let matcher = ErrorMatcher::baseline()
            .with(ErrorClass::NotFound, "no required module provides package")
            .with(ErrorClass::NotFound, "malformed module path")
            .with(ErrorClass::NotFound, "unrecognized import path")
            .with(ErrorClass::Build, "build constraints exclude all go files");
        Self { runner, matcher }
    }

    /// `$GOBIN`, else `$GOPATH/bin`, else `~/go/bin`.
    fn bin_dir() -> Option<PathBuf> {
        if let Ok(gobin) = env::var("GOBIN") {
            if !gobin.is_empty() {
                return Some(PathBuf::from(gobin));
            }
        }
        if let Ok(gopath) = env::var("GOPATH") {
            if !gopath.is_empty() {
                return Some(PathBuf::from(gopath).join("bin"));
            }
        }
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("go").join("bin"))
    }

    /// Binary name for a module path: the last path segment, or the
    /// segment after `cmd` for `.../cmd/<name>` layouts. A version suffix
    /// is stripped first.
    pub fn binary_name(module_path: &str) -> String {
        let path = module_path.split('@').next().unwrap_or(module_path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [.., "cmd", name] => (*name).to_string(),
            [.., name] => (*name).to_string(),
            [] => path.to_string(),
        }
    }

    /// Install target: `module@version`, defaulting to `latest`.
    fn install_target(spec: &str) -> String {
        if spec.contains('@') {
            spec.to_string()
        } else {
            format!("{spec}@latest")
        }
    }
}

#[async_trait]
impl PackageManager for Go {
    fn name(&self) -> &'static str {
        "go"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn matcher(&self) -> &ErrorMatcher {
        &self.matcher
    }

    fn install_hint(&self) -> &'static str {
        "Install Go from https://go.dev/dl"
    }

    fn probe_args(&self) -> &'static [&'static str] {
        &["version"]
    }

    /// Lock entries carry the binary name; the module path is kept in
    /// metadata so upgrades can re-resolve it.
    fn lock_name(&self, requested: &str) -> String {
        Self::binary_name(requested)
    }

    fn lock_metadata(&self, requested: &str) -> Vec<(String, String)> {
        let module = requested.split('@').next().unwrap_or(requested);
        if module == Self::binary_name(requested) {
            Vec::new()
        } else {
            vec![("source_path".to_string(), module.to_string())]
        }
    }

    async fn list_installed(&self, token: &CancellationToken) -> ManagerResult<Vec<String>> {
        let Some(bin_dir) = Self::bin_dir() else {
            return Ok(Vec::new());
        };
        let Ok(entries) = fs::read_dir(&bin_dir) else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            if token.is_cancelled() {
                return Err(CommandError::Cancelled.into());
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(path_str) = path.to_str() else {
                continue;
            };
            // non-Go binaries dropped in a shared bin dir fail this probe
            if self
                .runner
                .execute(token, "go", &["version", "-m", path_str])
                .await
                .is_ok()
            {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    async fn install(&self, token: &CancellationToken, name: &str) -> ManagerResult<()> {
        let target = Self::install_target(name);
        self.run_classified(token, PmOp::Install, name, "go", &["install", &target])
            .await
    }

    /// Go has no uninstall; the binary is removed from the bin directory.
    async fn uninstall(&self, _token: &CancellationToken, name: &str) -> ManagerResult<()> {
        let Some(bin_dir) = Self::bin_dir() else {
            return Ok(());
        };
        let binary = bin_dir.join(Self::binary_name(name));
        match fs::remove_file(&binary) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ManagerError::Uninstall {
                manager: "go".into(),
                package: name.into(),
                class: ErrorClass::Unknown,
                details: format!("removing {}: {err}", binary.display()),
            }),
        }
    }

    async fn is_installed(&self, token: &CancellationToken, name: &str) -> ManagerResult<bool> {
        let binary = Self::binary_name(name);
        Ok(self
            .list_installed(token)
            .await?
            .iter()
            .any(|installed| *installed == binary))
    }

    /// Reinstalls at `latest`, which is how go modules upgrade.
    async fn upgrade(&self, token: &CancellationToken, names: &[String]) -> ManagerResult<()> {
        let names = if names.is_empty() {
            self.list_installed(token).await?
        } else {
            names.to_vec()
        };
        for name in &names {
            let target = format!("{}@latest", name.split('@').next().unwrap_or(name));
            self.run_classified(token, PmOp::Upgrade, name, "go", &["install", &target])
                .await?;
        }
        Ok(())
    }

    async fn installed_version(
        &self,
        token: &CancellationToken,
        name: &str,
    ) -> ManagerResult<String> {
        let Some(bin_dir) = Self::bin_dir() else {
            return Err(ManagerError::NotFound {
                manager: "go".into(),
                package: name.into(),
            });
        };
        let binary = bin_dir.join(Self::binary_name(name));
        let Some(path_str) = binary.to_str() else {
            return Err(ManagerError::NotFound {
                manager: "go".into(),
                package: name.into(),
            });
        };

        let out = self
            .runner
            .execute(token, "go", &["version", "-m", path_str])
            .await
            .map_err(|_| ManagerError::NotFound {
                manager: "go".into(),
                package: name.into(),
            })?;

        // `        mod     github.com/junegunn/fzf v0.50.0 h1:...`
        out.lines()
            .map(str::trim)
            .find(|line| line.starts_with("mod"))
            .and_then(|line| line.split_whitespace().nth(2))
            .map(ToString::to_string)
            .ok_or_else(|| ManagerError::NotFound {
                manager: "go".into(),
                package: name.into(),
            })
    }

    async fn info(&self, token: &CancellationToken, name: &str) -> ManagerResult<PackageInfo> {
        let version = self.installed_version(token, name).await.ok();
        Ok(PackageInfo {
            name: name.to_string(),
            installed: version.is_some(),
            version,
            manager: "go".into(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::exec::FakeRunner;

    use super::*;

    #[test]
    fn test_binary_name_derivation() {
        assert_eq!(Go::binary_name("github.com/junegunn/fzf"), "fzf");
        assert_eq!(
            Go::binary_name("golang.org/x/tools/cmd/goimports"),
            "goimports"
        );
        assert_eq!(Go::binary_name("github.com/user/tool@v1.2.3"), "tool");
        assert_eq!(Go::binary_name("single"), "single");
    }

    #[test]
    fn test_install_target_defaults_to_latest() {
        assert_eq!(
            Go::install_target("github.com/junegunn/fzf"),
            "github.com/junegunn/fzf@latest"
        );
        assert_eq!(
            Go::install_target("github.com/junegunn/fzf@v0.50.0"),
            "github.com/junegunn/fzf@v0.50.0"
        );
    }

    #[tokio::test]
    async fn test_install_not_found_module() {
        let pm = Go::new(Arc::new(FakeRunner::new().with_binary("go").on_code(
            "go install example.com/nope@latest",
            "go: example.com/nope@latest: no required module provides package",
            1,
        )));
        let token = CancellationToken::new();
        assert!(matches!(
            pm.install(&token, "example.com/nope").await.unwrap_err(),
            ManagerError::NotFound { .. }
        ));
    }
}
