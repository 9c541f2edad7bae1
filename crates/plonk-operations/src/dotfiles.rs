//! Dotfile add and rm. These touch no lock file: dotfile state is the
//! filesystem.

use std::path::{Path, PathBuf};

use plonk_core::{CoreError, OperationResult, OperationStatus};
use tokio_util::sync::CancellationToken;

use crate::{context::PlonkContext, error::OpsResult};

/// Options for `plonk add`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Overwrite an existing source with the destination's content (the
    /// re-add path for drifted files).
    pub overwrite: bool,
}

/// Resolves a user-supplied path against `$HOME`: `~` expands, absolute
/// paths pass through, relative paths are taken relative to home.
fn resolve_home_path(ctx: &PlonkContext, raw: &str) -> OpsResult<PathBuf> {
    let expanded = plonk_utils::path::expand_tilde(raw).map_err(CoreError::Path)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(ctx.home().join(expanded))
    }
}

/// Starts managing files from `$HOME`. Directories are expanded to their
/// contained files, walked to the configured depth.
pub async fn add(
    ctx: &PlonkContext,
    _token: &CancellationToken,
    paths: &[String],
    options: &AddOptions,
) -> OpsResult<Vec<OperationResult>> {
    let engine = ctx.dotfiles();
    let mut results = Vec::new();

    for raw in paths {
        let path = resolve_home_path(ctx, raw)?;

        if path.is_dir() {
            let walked = plonk_utils::fs::walk_files(&path, ctx.config().dotfiles.max_depth)
                .map_err(CoreError::FileIo)?;
            if walked.is_empty() {
                results.push(OperationResult::failed(raw, "directory contains no files"));
                continue;
            }
            for file in walked {
                results.push(add_one(&engine, &file.path, options));
            }
            continue;
        }

        results.push(add_one(&engine, &path, options));
    }
    Ok(results)
}

fn add_one(
    engine: &plonk_core::DotfileEngine,
    path: &Path,
    options: &AddOptions,
) -> OperationResult {
    match engine.add(path, options.overwrite) {
        Ok(outcome) => {
            let status = if outcome.skipped {
                OperationStatus::Skipped
            } else if outcome.updated {
                OperationStatus::Updated
            } else {
                OperationStatus::Added
            };
            OperationResult::new(&outcome.name, status)
        }
        Err(err) => OperationResult::failed(&path.display().to_string(), &err),
    }
}

/// Stops managing dotfiles. Accepts either a destination path
/// (`~/.zshrc`) or a source-relative name (`zshrc`); the deployed
/// destination is never touched.
pub async fn rm(
    ctx: &PlonkContext,
    _token: &CancellationToken,
    paths: &[String],
) -> OpsResult<Vec<OperationResult>> {
    let engine = ctx.dotfiles();
    let mut results = Vec::with_capacity(paths.len());

    for raw in paths {
        let name = match source_name_for(ctx, &engine, raw) {
            Ok(name) => name,
            Err(err) => {
                results.push(OperationResult::failed(raw, &err));
                continue;
            }
        };
        match engine.unmanage(&name) {
            Ok(()) => results.push(OperationResult::new(&name, OperationStatus::Unlinked)),
            Err(err) => results.push(OperationResult::failed(&name, &err)),
        }
    }
    Ok(results)
}

fn source_name_for(
    ctx: &PlonkContext,
    engine: &plonk_core::DotfileEngine,
    raw: &str,
) -> OpsResult<String> {
    // a bare source-relative name wins when the source exists
    if !raw.starts_with(['/', '~', '.']) && engine.source_path(raw).is_file() {
        return Ok(raw.to_string());
    }
    let path = resolve_home_path(ctx, raw)?;
    Ok(engine.source_name(&path)?)
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use plonk_config::Config;
    use plonk_events::NullSink;
    use plonk_managers::FakeRunner;
    use tempfile::TempDir;

    use super::*;

    fn test_ctx() -> (TempDir, PlonkContext) {
        let dir = TempDir::new().unwrap();
        let plonk_dir = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk_dir).unwrap();
        fs::create_dir_all(&home).unwrap();
        let ctx = PlonkContext::new(
            plonk_dir,
            home,
            Config::default(),
            Arc::new(FakeRunner::new()),
            Arc::new(NullSink),
        );
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_add_file_and_rm() {
        let (_dir, ctx) = test_ctx();
        let token = CancellationToken::new();
        fs::write(ctx.home().join(".zshrc"), "export A=1\n").unwrap();

        let results = add(&ctx, &token, &["~/.zshrc".to_string()], &AddOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, OperationStatus::Added);
        assert!(ctx.plonk_dir().join("zshrc").is_file());

        let results = rm(&ctx, &token, &["zshrc".to_string()]).await.unwrap();
        assert_eq!(results[0].status, OperationStatus::Unlinked);
        assert!(!ctx.plonk_dir().join("zshrc").exists());
        // destination untouched
        assert!(ctx.home().join(".zshrc").exists());
    }

    #[tokio::test]
    async fn test_add_directory_expands_files() {
        let (_dir, ctx) = test_ctx();
        let token = CancellationToken::new();
        fs::create_dir_all(ctx.home().join(".config/nvim")).unwrap();
        fs::write(ctx.home().join(".config/nvim/init.lua"), "vim\n").unwrap();
        fs::write(ctx.home().join(".config/nvim/keys.lua"), "maps\n").unwrap();

        let results = add(
            &ctx,
            &token,
            &["~/.config/nvim".to_string()],
            &AddOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 2);
        assert!(ctx.plonk_dir().join("config/nvim/init.lua").is_file());
        assert!(ctx.plonk_dir().join("config/nvim/keys.lua").is_file());
    }

    #[tokio::test]
    async fn test_rm_by_destination_path() {
        let (_dir, ctx) = test_ctx();
        let token = CancellationToken::new();
        fs::write(ctx.plonk_dir().join("vimrc"), "set ai\n").unwrap();

        let results = rm(&ctx, &token, &["~/.vimrc".to_string()]).await.unwrap();
        assert_eq!(results[0].status, OperationStatus::Unlinked);
    }

    #[tokio::test]
    async fn test_rm_unmanaged_fails_item() {
        let (_dir, ctx) = test_ctx();
        let token = CancellationToken::new();
        let results = rm(&ctx, &token, &["zshrc".to_string()]).await.unwrap();
        assert_eq!(results[0].status, OperationStatus::Failed);
    }
}
