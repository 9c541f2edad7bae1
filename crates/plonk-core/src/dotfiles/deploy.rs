//! Content comparison and atomic deployment.

use std::{fs, path::Path};

use plonk_utils::{
    error::FileSystemError,
    fs::{atomic_write, file_mode, files_identical},
};

use crate::error::CoreResult;

/// Whether source and destination hold the same content.
///
/// Symlinks are resolved: a link to a regular file is compared by content,
/// anything else by its link target. Directories never compare equal to a
/// file.
pub fn compare_entry(source: &Path, target: &Path) -> CoreResult<bool> {
    let Ok(target_symlink_meta) = fs::symlink_metadata(target) else {
        return Ok(false);
    };

    if target_symlink_meta.file_type().is_symlink() {
        match fs::metadata(target) {
            Ok(resolved) if resolved.is_file() => {
                return Ok(files_identical(source, target)?);
            }
            _ => {
                // dangling or non-regular link: equal only if it points at
                // the source itself
                let link = fs::read_link(target).map_err(|err| {
                    FileSystemError::ReadFile {
                        path: target.to_path_buf(),
                        source: err,
                    }
                })?;
                return Ok(link == source);
            }
        }
    }

    if !target_symlink_meta.is_file() {
        return Ok(false);
    }

    Ok(files_identical(source, target)?)
}

/// Deploys `source` over `target` atomically.
///
/// The content is written to a sibling temp file with the source's
/// permission bits (or `mode` when given), fsynced and renamed over the
/// destination. Parent directories are created as needed. With `backup`,
/// an existing destination is first renamed to `<path>.bak`.
pub fn deploy_file(
    source: &Path,
    target: &Path,
    mode: Option<u32>,
    backup: bool,
) -> CoreResult<()> {
    let contents = fs::read(source).map_err(|err| FileSystemError::ReadFile {
        path: source.to_path_buf(),
        source: err,
    })?;
    let mode = match mode {
        Some(mode) => mode,
        None => file_mode(source)?,
    };

    if backup && fs::symlink_metadata(target).is_ok() {
        let mut bak = target.as_os_str().to_owned();
        bak.push(".bak");
        fs::rename(target, &bak).map_err(|err| FileSystemError::Rename {
            from: target.to_path_buf(),
            to: bak.clone().into(),
            source: err,
        })?;
    }

    atomic_write(target, &contents, mode)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_compare_identical_and_drifted() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("dst");
        fs::write(&source, "same\n").unwrap();
        fs::write(&target, "same\n").unwrap();
        assert!(compare_entry(&source, &target).unwrap());

        fs::write(&target, "diff\n").unwrap();
        assert!(!compare_entry(&source, &target).unwrap());
    }

    #[test]
    fn test_compare_missing_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::write(&source, "x").unwrap();
        assert!(!compare_entry(&source, &dir.path().join("gone")).unwrap());
    }

    #[test]
    fn test_compare_symlink_to_regular_compares_content() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        fs::write(&source, "content\n").unwrap();
        fs::write(&real, "content\n").unwrap();
        symlink(&real, &link).unwrap();
        assert!(compare_entry(&source, &link).unwrap());
    }

    #[test]
    fn test_compare_dangling_symlink_by_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::write(&source, "x").unwrap();

        let link = dir.path().join("link");
        symlink(&source, &link).unwrap();
        fs::remove_file(&source).unwrap();
        fs::write(&source, "x").unwrap();

        // link resolves to the source file itself, a regular file
        assert!(compare_entry(&source, &link).unwrap());

        let dangling = dir.path().join("dangling");
        symlink(dir.path().join("nowhere"), &dangling).unwrap();
        assert!(!compare_entry(&source, &dangling).unwrap());
    }

    #[test]
    fn test_deploy_mode_override() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("nested/dst");
        fs::write(&source, "data").unwrap();

        deploy_file(&source, &target, Some(0o640), false).unwrap();
        assert_eq!(file_mode(&target).unwrap(), 0o640);
        assert_eq!(fs::read(&target).unwrap(), b"data");
    }

    #[test]
    fn test_deploy_failure_leaves_destination_untouched() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("missing-source");
        let target = dir.path().join("dst");
        fs::write(&target, "original").unwrap();

        assert!(deploy_file(&source, &target, None, false).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"original");
    }
}
