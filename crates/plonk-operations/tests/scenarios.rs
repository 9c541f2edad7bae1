//! End-to-end scenarios against a programmed fake runner.

use std::{collections::BTreeMap, fs, sync::Arc};

use plonk_config::Config;
use plonk_core::{
    lock::{LockFile, ResourceEntry, LOCK_FILE},
    Domain, OperationStatus, ReconciliationState,
};
use plonk_events::NullSink;
use plonk_managers::FakeRunner;
use plonk_operations::{
    apply::apply, diff::diff, install::install, reconcile::reconcile_all, upgrade::upgrade,
    ApplyOptions, InstallOptions, PlonkContext,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Fixture {
    _dir: TempDir,
    runner: Arc<FakeRunner>,
    ctx: PlonkContext,
}

fn fixture(runner: FakeRunner) -> Fixture {
    let dir = TempDir::new().unwrap();
    let plonk_dir = dir.path().join("plonk");
    let home = dir.path().join("home");
    fs::create_dir_all(&plonk_dir).unwrap();
    fs::create_dir_all(&home).unwrap();

    let runner = Arc::new(runner);
    let ctx = PlonkContext::new(
        plonk_dir,
        home,
        Config::default(),
        runner.clone(),
        Arc::new(NullSink),
    );
    Fixture {
        _dir: dir,
        runner,
        ctx,
    }
}

fn seed_lock(ctx: &PlonkContext, entries: &[(&str, &str, Option<&str>)]) {
    let mut lock = LockFile::new();
    for (manager, name, version) in entries {
        let mut entry = ResourceEntry::package(manager, name, version.map(ToString::to_string));
        entry.installed_at = "2020-01-01T00:00:00.000000Z".to_string();
        lock.resources.push(entry);
    }
    ctx.lock().write(&lock).unwrap();
}

#[tokio::test]
async fn fresh_install_of_a_single_brew_package() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0")
            .on("brew install jq", "")
            .on("brew list --versions jq", "jq 1.7.1\n"),
    );
    let token = CancellationToken::new();

    let results = install(
        &fx.ctx,
        &token,
        &["brew:jq".to_string()],
        &InstallOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "jq");
    assert_eq!(results[0].manager.as_deref(), Some("brew"));
    assert_eq!(results[0].status, OperationStatus::Added);

    let lock = fx.ctx.lock().read().unwrap();
    assert_eq!(lock.resources.len(), 1);
    let entry = lock.find("brew", "jq").unwrap();
    assert!(!entry.installed_at.is_empty());
    assert_eq!(entry.version.as_deref(), Some("1.7.1"));
}

#[tokio::test]
async fn install_with_unavailable_manager() {
    // npm is not on PATH
    let fx = fixture(FakeRunner::new());
    let token = CancellationToken::new();

    let results = install(
        &fx.ctx,
        &token,
        &["npm:prettier".to_string()],
        &InstallOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, OperationStatus::Failed);
    let error = results[0].error.as_deref().unwrap();
    assert!(error.contains("npm"), "error should name the manager: {error}");
    let suggestion = results[0].metadata.get("suggestion").unwrap();
    assert!(
        suggestion.contains("Node.js"),
        "suggestion should mention Node.js: {suggestion}"
    );

    let lock = fx.ctx.lock().read().unwrap();
    assert!(lock.resources.is_empty());
}

#[tokio::test]
async fn status_with_mixed_state() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0")
            .on(
                "brew info --installed --json=v2",
                r#"{"formulae":[{"name":"jq"},{"name":"ripgrep"}],"casks":[]}"#,
            ),
    );
    seed_lock(&fx.ctx, &[("brew", "jq", None), ("brew", "wget", None)]);
    let token = CancellationToken::new();

    let report = reconcile_all(&fx.ctx, &token).await.unwrap();
    let packages = report.results.get(&Domain::Package).unwrap();

    let names = |items: &[plonk_core::Item]| -> Vec<String> {
        items.iter().map(|item| item.name.clone()).collect()
    };
    assert_eq!(names(&packages.managed), vec!["jq"]);
    assert_eq!(names(&packages.missing), vec!["wget"]);
    assert_eq!(names(&packages.untracked), vec!["ripgrep"]);
    assert!(packages.drifted.is_empty());
}

#[tokio::test]
async fn drifted_dotfile_diff_puts_destination_first() {
    let fx = fixture(FakeRunner::new());
    fs::write(fx.ctx.plonk_dir().join("vimrc"), "version 1\n").unwrap();
    fs::write(fx.ctx.home().join(".vimrc"), "version 2\n").unwrap();
    let token = CancellationToken::new();

    let report = reconcile_all(&fx.ctx, &token).await.unwrap();
    let dotfiles = report.results.get(&Domain::Dotfile).unwrap();
    assert_eq!(dotfiles.drifted.len(), 1);
    assert_eq!(dotfiles.drifted[0].name, "vimrc");
    assert_eq!(dotfiles.drifted[0].state, ReconciliationState::Drifted);

    let target = fx.ctx.home().join(".vimrc").display().to_string();
    let source = fx.ctx.plonk_dir().join("vimrc").display().to_string();
    let command_line = format!("git diff --no-index {target} {source}");
    let git_runner = Arc::new(
        FakeRunner::new()
            .with_binary("git")
            .on_code(&command_line, "-version 2\n+version 1\n", 1),
    );
    let diff_ctx = PlonkContext::new(
        fx.ctx.plonk_dir().clone(),
        fx.ctx.home().clone(),
        Config::default(),
        git_runner.clone(),
        Arc::new(NullSink),
    );

    let entries = diff(&diff_ctx, &token, Some("vimrc")).await.unwrap();
    assert_eq!(entries.len(), 1);
    // the modified home content appears on '-' lines
    assert!(entries[0].output.starts_with("-version 2"));
    assert_eq!(git_runner.calls(), vec![command_line]);
}

#[tokio::test]
async fn upgrade_updates_lock_version_and_timestamp() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0")
            .on("brew upgrade jq", "Upgraded jq")
            .on("brew list --versions jq", "jq 2.0\n"),
    );
    seed_lock(&fx.ctx, &[("brew", "jq", Some("1.0"))]);
    let before = fx
        .ctx
        .lock()
        .read()
        .unwrap()
        .find("brew", "jq")
        .unwrap()
        .clone();
    let token = CancellationToken::new();

    let results = upgrade(&fx.ctx, &token, &["brew:jq".to_string()])
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, OperationStatus::Updated);
    assert_eq!(results[0].version.as_deref(), Some("2.0"));

    let entry = fx
        .ctx
        .lock()
        .read()
        .unwrap()
        .find("brew", "jq")
        .unwrap()
        .clone();
    assert_eq!(entry.version.as_deref(), Some("2.0"));
    assert!(
        entry.installed_at > before.installed_at,
        "installed_at must be strictly newer: {} vs {}",
        entry.installed_at,
        before.installed_at
    );
}

#[tokio::test]
async fn apply_dry_run_changes_nothing() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0")
            .on("brew info --installed --json=v2", r#"{"formulae":[],"casks":[]}"#),
    );
    seed_lock(
        &fx.ctx,
        &[("brew", "jq", None), ("npm", "prettier", None)],
    );
    let lock_bytes_before = fs::read(fx.ctx.plonk_dir().join(LOCK_FILE)).unwrap();
    let token = CancellationToken::new();

    let report = apply(
        &fx.ctx,
        &token,
        &ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.results.len(), 2);
    for result in &report.results {
        assert_eq!(result.status, OperationStatus::WouldInstall);
    }

    for call in fx.runner.calls() {
        assert!(
            !call.contains(" install ") && !call.contains(" uninstall "),
            "dry run must not invoke install/uninstall: {call}"
        );
    }

    let lock_bytes_after = fs::read(fx.ctx.plonk_dir().join(LOCK_FILE)).unwrap();
    assert_eq!(lock_bytes_before, lock_bytes_after);
}

#[tokio::test]
async fn upgrade_with_unavailable_manager_fails_its_items() {
    let fx = fixture(FakeRunner::new());
    seed_lock(
        &fx.ctx,
        &[("npm", "prettier", None), ("npm", "eslint", None)],
    );
    let token = CancellationToken::new();

    let results = upgrade(&fx.ctx, &token, &[]).await.unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.status, OperationStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("npm"));
    }
    // lock untouched
    let lock = fx.ctx.lock().read().unwrap();
    assert_eq!(lock.resources.len(), 2);
    assert!(lock.find("npm", "prettier").unwrap().version.is_none());
}

#[tokio::test]
async fn apply_continues_past_item_failure() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0")
            .on("brew info --installed --json=v2", r#"{"formulae":[],"casks":[]}"#)
            .on_code("brew install bad", "Error: No available formula", 1)
            .on("brew install good", "")
            .on("brew list --versions good", "good 1.0\n"),
    );
    seed_lock(&fx.ctx, &[("brew", "bad", None), ("brew", "good", None)]);
    let token = CancellationToken::new();

    let report = apply(&fx.ctx, &token, &ApplyOptions::default()).await.unwrap();
    assert_eq!(report.results.len(), 2);

    let by_name: BTreeMap<_, _> = report
        .results
        .iter()
        .map(|result| (result.name.clone(), result.status))
        .collect();
    assert_eq!(by_name["bad"], OperationStatus::Failed);
    assert_eq!(by_name["good"], OperationStatus::Added);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.added, 1);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn cancelled_token_runs_no_subprocesses() {
    let fx = fixture(
        FakeRunner::new()
            .with_binary("brew")
            .on("brew --version", "Homebrew 4.0"),
    );
    let token = CancellationToken::new();
    token.cancel();

    let err = install(
        &fx.ctx,
        &token,
        &["brew:jq".to_string()],
        &InstallOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(err.is_cancelled());
    assert!(fx.runner.calls().is_empty());
}
