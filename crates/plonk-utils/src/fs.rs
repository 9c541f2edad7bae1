use std::{
    collections::HashSet,
    fs::{self, File},
    io::{BufReader, Read, Write},
    os::unix::fs::{MetadataExt, PermissionsExt},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::{FileSystemError, FileSystemResult, IoResultExt};

/// Creates a directory structure if it doesn't exist.
///
/// If the directory already exists, this function does nothing. If the path
/// exists but is not a directory, an error is returned.
///
/// # Errors
///
/// * [`FileSystemError::CreateDirectory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| FileSystemError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Atomically replaces the file at `target` with `contents`.
///
/// The bytes are written to a temporary file in the target's directory,
/// fsynced, then renamed over the target so concurrent readers only ever
/// observe a complete file. Parent directories are created as needed.
///
/// # Arguments
///
/// * `target` - The path to replace.
/// * `contents` - The bytes to write.
/// * `mode` - Unix permission bits for the new file, e.g. `0o644`.
///
/// # Errors
///
/// Returns a [`FileSystemError`] if the temporary file cannot be created,
/// written, or renamed into place. The target is untouched on error.
pub fn atomic_write<P: AsRef<Path>>(target: P, contents: &[u8], mode: u32) -> FileSystemResult<()> {
    let target = target.as_ref();
    let parent = target.parent().ok_or_else(|| FileSystemError::WriteFile {
        path: target.to_path_buf(),
        source: std::io::Error::other("target has no parent directory"),
    })?;
    ensure_dir_exists(parent)?;

    let mut tmp = NamedTempFile::new_in(parent).with_write_path(target)?;
    tmp.write_all(contents).with_write_path(target)?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))
        .with_write_path(target)?;
    tmp.as_file().sync_all().with_write_path(target)?;

    tmp.persist(target)
        .map_err(|err| FileSystemError::Rename {
            from: err.file.path().to_path_buf(),
            to: target.to_path_buf(),
            source: err.error,
        })?;

    Ok(())
}

/// Compares two files for byte identity.
///
/// Sizes are compared first; contents are only read when the sizes match.
/// Either path missing compares as not equal.
///
/// # Errors
///
/// Returns a [`FileSystemError::ReadFile`] if an existing file cannot be read.
pub fn files_identical<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> FileSystemResult<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());

    let meta_a = match fs::metadata(a) {
        Ok(m) => m,
        Err(_) => return Ok(false),
    };
    let meta_b = match fs::metadata(b) {
        Ok(m) => m,
        Err(_) => return Ok(false),
    };

    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).with_read_path(a)?);
    let mut reader_b = BufReader::new(File::open(b).with_read_path(b)?);

    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n = reader_a.read(&mut buf_a).with_read_path(a)?;
        if n == 0 {
            return Ok(true);
        }
        reader_b.read_exact(&mut buf_b[..n]).with_read_path(b)?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}

/// A file discovered by [`walk_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the walk root, always with `/` separators.
    pub relative: String,
}

/// Walks a directory tree, collecting regular files.
///
/// Recursion stops `max_depth` levels below `root` (a file directly inside
/// `root` is at depth 1). Symlinked directories are followed, with visited
/// device/inode pairs tracked so cycles terminate. Entries are returned in
/// sorted order by relative path.
///
/// # Errors
///
/// Returns a [`FileSystemError::ReadDirectory`] if `root` or any directory
/// inside it cannot be read.
pub fn walk_files<P: AsRef<Path>>(root: P, max_depth: usize) -> FileSystemResult<Vec<WalkedFile>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut visited = HashSet::new();
    if let Ok(meta) = fs::metadata(root) {
        visited.insert((meta.dev(), meta.ino()));
    }

    let mut files = Vec::new();
    walk_into(root, String::new(), 1, max_depth, &mut visited, &mut files)?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn walk_into(
    dir: &Path,
    prefix: String,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<(u64, u64)>,
    files: &mut Vec<WalkedFile>,
) -> FileSystemResult<()> {
    if depth > max_depth {
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|source| FileSystemError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        // fs::metadata follows symlinks, so a link to a file counts as a file
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };

        if meta.is_dir() {
            if !visited.insert((meta.dev(), meta.ino())) {
                continue;
            }
            walk_into(&path, relative, depth + 1, max_depth, visited, files)?;
        } else if meta.is_file() {
            files.push(WalkedFile { path, relative });
        }
    }

    Ok(())
}

/// Unix permission bits of `path`, following symlinks.
pub fn file_mode<P: AsRef<Path>>(path: P) -> FileSystemResult<u32> {
    let path = path.as_ref();
    let meta = fs::metadata(path).with_read_path(path)?;
    Ok(meta.permissions().mode() & 0o7777)
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("a/b/c");
        ensure_dir_exists(&new_dir).unwrap();
        assert!(new_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "hello").unwrap();
        assert!(ensure_dir_exists(&file_path).is_err());
    }

    #[test]
    fn test_atomic_write_creates_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        atomic_write(&target, b"payload", 0o644).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert_eq!(file_mode(&target).unwrap(), 0o644);
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        fs::write(&target, "old").unwrap();
        atomic_write(&target, b"new", 0o600).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(file_mode(&target).unwrap(), 0o600);
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/deeper/out.txt");
        atomic_write(&target, b"x", 0o644).unwrap();
        assert!(target.is_file());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        atomic_write(&target, b"payload", 0o644).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_files_identical_same_bytes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "same content").unwrap();
        fs::write(&b, "same content").unwrap();
        assert!(files_identical(&a, &b).unwrap());
    }

    #[test]
    fn test_files_identical_one_byte_differs() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "version 1\n").unwrap();
        fs::write(&b, "version 2\n").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn test_files_identical_size_differs() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "short").unwrap();
        fs::write(&b, "much longer content").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn test_files_identical_missing_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, "x").unwrap();
        assert!(!files_identical(&a, dir.path().join("missing")).unwrap());
    }

    #[test]
    fn test_walk_files_sorted_relative_paths() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zshrc"), "z").unwrap();
        fs::create_dir_all(dir.path().join("config/nvim")).unwrap();
        fs::write(dir.path().join("config/nvim/init.lua"), "l").unwrap();
        fs::write(dir.path().join("gitconfig"), "g").unwrap();

        let files = walk_files(dir.path(), 10).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["config/nvim/init.lua", "gitconfig", "zshrc"]);
    }

    #[test]
    fn test_walk_files_depth_cap() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("top"), "1").unwrap();
        fs::write(dir.path().join("a/mid"), "2").unwrap();
        fs::write(dir.path().join("a/b/deep"), "3").unwrap();
        fs::write(dir.path().join("a/b/c/deepest"), "4").unwrap();

        let files = walk_files(dir.path(), 2).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["a/mid", "top"]);
    }

    #[test]
    fn test_walk_files_breaks_symlink_loop() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("file"), "x").unwrap();
        symlink(dir.path(), sub.join("loop")).unwrap();

        let files = walk_files(dir.path(), 10).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "sub/file");
    }

    #[test]
    fn test_walk_files_not_a_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(walk_files(&file, 10).is_err());
    }
}
