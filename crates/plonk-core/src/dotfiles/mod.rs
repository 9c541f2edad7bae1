//! The dotfile engine: source scanning, destination mapping, drift
//! detection and atomic deployment.
//!
//! Sources live in the plonk directory; destinations live under `$HOME`
//! with a dot prepended to the first path component (`zshrc` deploys to
//! `~/.zshrc`, `config/nvim/init.lua` to `~/.config/nvim/init.lua`).
//! A top-level directory is mapped file by file only when it appears in
//! `expand_directories`; any other directory is tracked as one unit
//! (`vim` deploys to `~/.vim`), though its contents are still compared
//! and copied file by file, never as an opaque blob. The engine owns
//! destination content but never deletes a destination: unmanaging only
//! removes the source.

mod deploy;

pub use deploy::compare_entry;

use std::{
    fs,
    path::{Path, PathBuf},
};

use plonk_config::Config;
use tracing::debug;

use crate::{
    error::{CoreError, CoreResult},
    types::{DotfileStatus, Domain, Item, ReconcileResult, ReconciliationState},
};

/// Outcome of adding one file from `$HOME` into the plonk directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// Source-relative name.
    pub name: String,
    /// Whether an existing source was overwritten.
    pub updated: bool,
    /// Whether an existing source was kept because overwrite was off.
    pub skipped: bool,
}

pub struct DotfileEngine {
    plonk_dir: PathBuf,
    home: PathBuf,
    config: Config,
}

impl DotfileEngine {
    pub fn new(plonk_dir: PathBuf, home: PathBuf, config: Config) -> Self {
        Self {
            plonk_dir,
            home,
            config,
        }
    }

    pub fn plonk_dir(&self) -> &Path {
        &self.plonk_dir
    }

    /// Absolute destination for a source-relative name.
    pub fn target_path(&self, relative: &str) -> PathBuf {
        self.home.join(format!(".{relative}"))
    }

    /// Absolute source path for a source-relative name.
    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.plonk_dir.join(relative)
    }

    /// Source-relative name for an absolute destination under `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`plonk_utils::error::PathError::OutsideHome`] when the
    /// path is not inside the home directory, and
    /// [`CoreError::InvalidSpec`]-style `FileNotFound` when it does not
    /// start with a dot component.
    pub fn source_name(&self, target: &Path) -> CoreResult<String> {
        let relative = target.strip_prefix(&self.home).map_err(|_| {
            CoreError::Path(plonk_utils::error::PathError::OutsideHome {
                path: target.to_path_buf(),
            })
        })?;
        let relative = relative.to_string_lossy();
        let stripped = relative
            .strip_prefix('.')
            .ok_or_else(|| CoreError::FileNotFound {
                path: target.to_path_buf(),
            })?;
        Ok(stripped.to_string())
    }

    /// Scans the source tree, returning statuses sorted by name.
    ///
    /// Ignored patterns and the plonk metadata files are skipped. A top
    /// level directory named in `expand_directories` contributes one
    /// entry per contained file; any other directory contributes a
    /// single unit entry. Walks descend at most the configured number
    /// of levels below each directory root, with symlink loops broken
    /// inside the walk.
    pub fn scan(&self) -> CoreResult<Vec<DotfileStatus>> {
        if !self.plonk_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = fs::read_dir(&self.plonk_dir).map_err(|source| {
            CoreError::FileIo(plonk_utils::error::FileSystemError::ReadDirectory {
                path: self.plonk_dir.clone(),
                source,
            })
        })?;
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.config.is_ignored(&name) {
                continue;
            }
            let path = entry.path();
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if meta.is_file() {
                names.push(name);
            } else if meta.is_dir() {
                if self.config.expands(&name) {
                    let walked =
                        plonk_utils::fs::walk_files(&path, self.config.dotfiles.max_depth)?;
                    for file in walked {
                        let relative = format!("{name}/{}", file.relative);
                        if !self.config.is_ignored(&relative) {
                            names.push(relative);
                        }
                    }
                } else {
                    names.push(name);
                }
            }
        }
        names.sort_unstable();

        let mut statuses = Vec::with_capacity(names.len());
        for name in names {
            let source = self.source_path(&name);
            let target = self.target_path(&name);
            let state = self.classify(&source, &target)?;
            statuses.push(DotfileStatus {
                name,
                source,
                target,
                state,
            });
        }
        Ok(statuses)
    }

    /// Reconciles the dotfile domain.
    ///
    /// Declared items come from the source scan; observed items are the
    /// corresponding destinations, so this domain never reports
    /// untracked entries.
    pub fn reconcile(&self) -> CoreResult<ReconcileResult> {
        let mut result = ReconcileResult::new(Domain::Dotfile);
        for status in self.scan()? {
            result.push(Item::dotfile(&status.name, status.target, status.state));
        }
        result.sort();
        Ok(result)
    }

    fn classify(&self, source: &Path, target: &Path) -> CoreResult<ReconciliationState> {
        if fs::symlink_metadata(target).is_err() {
            return Ok(ReconciliationState::Missing);
        }
        if source.is_dir() {
            return self.classify_unit(source, target);
        }
        if compare_entry(source, target)? {
            Ok(ReconciliationState::Managed)
        } else {
            Ok(ReconciliationState::Drifted)
        }
    }

    // A unit directory is never compared as a blob: it drifts when any
    // contained source file differs from (or is absent at) its
    // destination.
    fn classify_unit(&self, source: &Path, target: &Path) -> CoreResult<ReconciliationState> {
        let files = plonk_utils::fs::walk_files(source, self.config.dotfiles.max_depth)?;
        for file in &files {
            if !compare_entry(&file.path, &target.join(&file.relative))? {
                return Ok(ReconciliationState::Drifted);
            }
        }
        Ok(ReconciliationState::Managed)
    }

    /// Deploys one source to its destination atomically, copying the
    /// source's permission bits unless `mode` overrides them. A unit
    /// directory deploys each contained file in turn, each one
    /// atomically.
    pub fn deploy(&self, relative: &str, mode: Option<u32>) -> CoreResult<()> {
        let source = self.source_path(relative);
        let target = self.target_path(relative);

        if source.is_dir() {
            let files = plonk_utils::fs::walk_files(&source, self.config.dotfiles.max_depth)?;
            for file in files {
                deploy::deploy_file(
                    &file.path,
                    &target.join(&file.relative),
                    mode,
                    self.config.dotfiles.backup,
                )?;
            }
            debug!(source = %source.display(), target = %target.display(), "unit directory deployed");
            return Ok(());
        }

        if !source.is_file() {
            return Err(CoreError::FileNotFound { path: source });
        }
        deploy::deploy_file(&source, &target, mode, self.config.dotfiles.backup)?;
        debug!(source = %source.display(), target = %target.display(), "dotfile deployed");
        Ok(())
    }

    /// Copies a file from `$HOME` into the plonk directory, making it
    /// managed. With `overwrite`, an existing source is replaced (the
    /// re-add path for drifted files).
    pub fn add(&self, target: &Path, overwrite: bool) -> CoreResult<AddOutcome> {
        // follows symlinks: adding a linked file captures its content
        let is_file = fs::metadata(target).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Err(CoreError::FileNotFound {
                path: target.to_path_buf(),
            });
        }

        let name = self.source_name(target)?;
        let source = self.source_path(&name);
        let existed = source.exists();
        if existed && !overwrite {
            return Ok(AddOutcome {
                name,
                updated: false,
                skipped: true,
            });
        }

        let contents =
            fs::read(target).map_err(|source_err| CoreError::FileIo(
                plonk_utils::error::FileSystemError::ReadFile {
                    path: target.to_path_buf(),
                    source: source_err,
                },
            ))?;
        let mode = plonk_utils::fs::file_mode(target)?;
        plonk_utils::fs::atomic_write(&source, &contents, mode)?;

        Ok(AddOutcome {
            name,
            updated: existed,
            skipped: false,
        })
    }

    /// Stops managing a dotfile (or a unit directory) by removing its
    /// source. The deployed destination is left untouched.
    pub fn unmanage(&self, name: &str) -> CoreResult<()> {
        let source = self.source_path(name);
        if !source.exists() {
            return Err(CoreError::FileNotFound { path: source });
        }
        let removed = if source.is_dir() {
            fs::remove_dir_all(&source)
        } else {
            fs::remove_file(&source)
        };
        removed.map_err(|source_err| {
            CoreError::FileIo(plonk_utils::error::FileSystemError::RemoveFile {
                path: source.clone(),
                source: source_err,
            })
        })?;
        debug!(source = %source.display(), "dotfile unmanaged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::*;

    fn engine(plonk_dir: &Path, home: &Path) -> DotfileEngine {
        DotfileEngine::new(
            plonk_dir.to_path_buf(),
            home.to_path_buf(),
            Config::default(),
        )
    }

    #[test]
    fn test_target_mapping() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        let eng = engine(&dir.path().join("plonk"), &home);
        assert_eq!(eng.target_path("zshrc"), home.join(".zshrc"));
        assert_eq!(
            eng.target_path("config/nvim/init.lua"),
            home.join(".config/nvim/init.lua")
        );
    }

    #[test]
    fn test_source_name_from_target() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        let eng = engine(&dir.path().join("plonk"), &home);
        assert_eq!(eng.source_name(&home.join(".zshrc")).unwrap(), "zshrc");
        assert_eq!(
            eng.source_name(&home.join(".config/nvim/init.lua")).unwrap(),
            "config/nvim/init.lua"
        );
        assert!(eng.source_name(Path::new("/etc/passwd")).is_err());
        assert!(eng.source_name(&home.join("not-hidden")).is_err());
    }

    #[test]
    fn test_scan_classifies_states() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk).unwrap();
        fs::create_dir_all(&home).unwrap();

        // managed: identical bytes
        fs::write(plonk.join("zshrc"), "export A=1\n").unwrap();
        fs::write(home.join(".zshrc"), "export A=1\n").unwrap();
        // drifted: destination edited
        fs::write(plonk.join("vimrc"), "version 1\n").unwrap();
        fs::write(home.join(".vimrc"), "version 2\n").unwrap();
        // missing: never deployed
        fs::write(plonk.join("gitconfig"), "[user]\n").unwrap();
        // metadata files are skipped
        fs::write(plonk.join("plonk.yaml"), "default_manager: brew\n").unwrap();
        fs::write(plonk.join("plonk.lock"), "version: 2\n").unwrap();

        let eng = engine(&plonk, &home);
        let statuses = eng.scan().unwrap();
        let summary: Vec<_> = statuses
            .iter()
            .map(|s| (s.name.as_str(), s.state))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("gitconfig", ReconciliationState::Missing),
                ("vimrc", ReconciliationState::Drifted),
                ("zshrc", ReconciliationState::Managed),
            ]
        );
    }

    #[test]
    fn test_scan_expands_configured_directories_file_by_file() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(plonk.join("config/nvim")).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("config/nvim/init.lua"), "vim.opt\n").unwrap();

        // `config` is in the default expand_directories
        let eng = engine(&plonk, &home);
        let statuses = eng.scan().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "config/nvim/init.lua");
        assert_eq!(statuses[0].target, home.join(".config/nvim/init.lua"));
        assert_eq!(statuses[0].state, ReconciliationState::Missing);
    }

    #[test]
    fn test_scan_tracks_unexpanded_directory_as_unit() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(plonk.join("vim/colors")).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("vim/vimrc"), "set ai\n").unwrap();
        fs::write(plonk.join("vim/colors/dark.vim"), "hi Normal\n").unwrap();

        // `vim` is not in expand_directories: one entry, not one per file
        let eng = engine(&plonk, &home);
        let statuses = eng.scan().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "vim");
        assert_eq!(statuses[0].target, home.join(".vim"));
        assert_eq!(statuses[0].state, ReconciliationState::Missing);
    }

    #[test]
    fn test_unit_directory_deploy_and_drift() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(plonk.join("vim/colors")).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("vim/vimrc"), "set ai\n").unwrap();
        fs::write(plonk.join("vim/colors/dark.vim"), "hi Normal\n").unwrap();

        let eng = engine(&plonk, &home);
        eng.deploy("vim", None).unwrap();
        assert_eq!(fs::read(home.join(".vim/vimrc")).unwrap(), b"set ai\n");
        assert_eq!(
            fs::read(home.join(".vim/colors/dark.vim")).unwrap(),
            b"hi Normal\n"
        );
        assert_eq!(eng.scan().unwrap()[0].state, ReconciliationState::Managed);

        // one edited contained file drifts the whole unit
        fs::write(home.join(".vim/vimrc"), "set noai\n").unwrap();
        assert_eq!(eng.scan().unwrap()[0].state, ReconciliationState::Drifted);

        // a contained file missing from the destination also drifts it
        fs::write(home.join(".vim/vimrc"), "set ai\n").unwrap();
        fs::remove_file(home.join(".vim/colors/dark.vim")).unwrap();
        assert_eq!(eng.scan().unwrap()[0].state, ReconciliationState::Drifted);
    }

    #[test]
    fn test_unmanage_unit_directory() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(plonk.join("vim")).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("vim/vimrc"), "set ai\n").unwrap();

        let eng = engine(&plonk, &home);
        eng.deploy("vim", None).unwrap();
        eng.unmanage("vim").unwrap();
        assert!(!plonk.join("vim").exists());
        // deployed files stay in place
        assert!(home.join(".vim/vimrc").exists());
    }

    #[test]
    fn test_deploy_creates_destination_with_source_perms() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk).unwrap();
        fs::create_dir_all(&home).unwrap();

        let source = plonk.join("sshconfig");
        fs::write(&source, "Host *\n").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o600)).unwrap();

        let eng = engine(&plonk, &home);
        eng.deploy("sshconfig", None).unwrap();

        let target = home.join(".sshconfig");
        assert_eq!(fs::read(&target).unwrap(), b"Host *\n");
        assert_eq!(plonk_utils::fs::file_mode(&target).unwrap(), 0o600);
    }

    #[test]
    fn test_deploy_backup_keeps_previous_destination() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("zshrc"), "new\n").unwrap();
        fs::write(home.join(".zshrc"), "old\n").unwrap();

        let config = Config {
            dotfiles: plonk_config::config::DotfilesConfig {
                backup: true,
                ..Default::default()
            },
            ..Config::default()
        };
        let eng = DotfileEngine::new(plonk.clone(), home.clone(), config);
        eng.deploy("zshrc", None).unwrap();

        assert_eq!(fs::read(home.join(".zshrc")).unwrap(), b"new\n");
        assert_eq!(fs::read(home.join(".zshrc.bak")).unwrap(), b"old\n");
    }

    #[test]
    fn test_add_and_re_add() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".zshrc"), "v1\n").unwrap();

        let eng = engine(&plonk, &home);
        let outcome = eng.add(&home.join(".zshrc"), false).unwrap();
        assert_eq!(outcome.name, "zshrc");
        assert!(!outcome.updated);
        assert_eq!(fs::read(plonk.join("zshrc")).unwrap(), b"v1\n");

        // re-add with overwrite copies the drifted destination back
        fs::write(home.join(".zshrc"), "v2\n").unwrap();
        let outcome = eng.add(&home.join(".zshrc"), true).unwrap();
        assert!(outcome.updated);
        assert_eq!(fs::read(plonk.join("zshrc")).unwrap(), b"v2\n");

        // without overwrite the source is kept
        fs::write(home.join(".zshrc"), "v3\n").unwrap();
        let outcome = eng.add(&home.join(".zshrc"), false).unwrap();
        assert!(outcome.skipped);
        assert_eq!(fs::read(plonk.join("zshrc")).unwrap(), b"v2\n");
    }

    #[test]
    fn test_unmanage_removes_source_keeps_destination() {
        let dir = tempdir().unwrap();
        let plonk = dir.path().join("plonk");
        let home = dir.path().join("home");
        fs::create_dir_all(&plonk).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(plonk.join("zshrc"), "x\n").unwrap();
        fs::write(home.join(".zshrc"), "x\n").unwrap();

        let eng = engine(&plonk, &home);
        eng.unmanage("zshrc").unwrap();
        assert!(!plonk.join("zshrc").exists());
        assert!(home.join(".zshrc").exists());

        assert!(matches!(
            eng.unmanage("zshrc").unwrap_err(),
            CoreError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_empty_plonk_dir_reconciles_empty() {
        let dir = tempdir().unwrap();
        let eng = engine(&dir.path().join("missing"), &dir.path().join("home"));
        let result = eng.reconcile().unwrap();
        assert!(result.is_empty());
    }
}
