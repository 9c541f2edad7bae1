use std::{env, path::PathBuf};

use crate::error::{PathError, PathResult};

/// Returns the user's home directory.
///
/// # Errors
///
/// Returns [`PathError::NoHome`] if the `HOME` environment variable is unset.
pub fn home_dir() -> PathResult<PathBuf> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| PathError::NoHome)
}

/// Returns the user's config directory following the XDG Base Directory
/// Specification.
///
/// Checks `XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathResult<PathBuf> {
    match env::var("XDG_CONFIG_HOME") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(home_dir()?.join(".config")),
    }
}

/// Returns the plonk directory.
///
/// `PLONK_DIR` overrides the default of `$XDG_CONFIG_HOME/plonk`
/// (`~/.config/plonk`).
pub fn plonk_dir() -> PathResult<PathBuf> {
    match env::var("PLONK_DIR") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(xdg_config_home()?.join("plonk")),
    }
}

/// Expands a leading `~` or `~/` to the user's home directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the input is empty.
/// * [`PathError::NoHome`] if expansion is needed and `HOME` is unset.
pub fn expand_tilde(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    if path == "~" {
        return home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_home_dir_from_env() {
        env::set_var("HOME", "/home/testuser");
        assert_eq!(home_dir().unwrap(), PathBuf::from("/home/testuser"));
    }

    #[test]
    #[serial]
    fn test_plonk_dir_override() {
        env::set_var("PLONK_DIR", "/tmp/custom-plonk");
        assert_eq!(plonk_dir().unwrap(), PathBuf::from("/tmp/custom-plonk"));
        env::remove_var("PLONK_DIR");
    }

    #[test]
    #[serial]
    fn test_plonk_dir_default() {
        env::remove_var("PLONK_DIR");
        env::remove_var("XDG_CONFIG_HOME");
        env::set_var("HOME", "/home/testuser");
        assert_eq!(
            plonk_dir().unwrap(),
            PathBuf::from("/home/testuser/.config/plonk")
        );
    }

    #[test]
    #[serial]
    fn test_expand_tilde() {
        env::set_var("HOME", "/home/testuser");
        assert_eq!(
            expand_tilde("~/.zshrc").unwrap(),
            PathBuf::from("/home/testuser/.zshrc")
        );
        assert_eq!(expand_tilde("~").unwrap(), PathBuf::from("/home/testuser"));
        assert_eq!(expand_tilde("/abs/path").unwrap(), PathBuf::from("/abs/path"));
        assert!(expand_tilde("").is_err());
    }
}
