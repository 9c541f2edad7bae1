//! Pure text extractors for package manager output.
//!
//! Every parser maps empty input to an empty vector, skips banner and
//! warning lines, and preserves input order.

use serde::Deserialize;

/// Line prefixes that are never package names.
const BANNERS: &[&str] = &[
    "WARNING:",
    "Listing...",
    "Done",
    "==>",
    "N: ",
    "Package ",
    "---",
];

/// Non-empty trimmed lines with banners removed.
pub fn clean_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !BANNERS.iter().any(|banner| line.starts_with(banner)))
        .collect()
}

/// One package name per line, first whitespace-separated token.
pub fn first_token_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .collect()
}

/// Names from `npm ls -g --parseable` style path output.
///
/// Each line is an installed path; the name is everything after the last
/// `node_modules/` component, which keeps scoped names (`@scope/pkg`)
/// intact. Lines without a `node_modules` component (the prefix line) and
/// bare filesystem segments such as `lib` are dropped.
pub fn npm_parseable_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter_map(|line| {
            line.rfind("node_modules/")
                .map(|idx| &line[idx + "node_modules/".len()..])
        })
        .filter(|name| !name.is_empty() && *name != "lib")
        .map(ToString::to_string)
        .collect()
}

#[derive(Deserialize)]
struct PipListEntry {
    name: String,
    #[allow(dead_code)]
    version: Option<String>,
}

/// Names from `pip list --format=json`.
pub fn pip_json_names(output: &str) -> Result<Vec<String>, serde_json::Error> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<PipListEntry> = serde_json::from_str(output.trim())?;
    Ok(entries
        .into_iter()
        .map(|entry| normalize_py_name(&entry.name))
        .collect())
}

/// Names from plain `pip list` output, skipping the header and separator.
pub fn pip_plain_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter(|line| !line.starts_with("Package"))
        .filter_map(|line| line.split_whitespace().next())
        .map(normalize_py_name)
        .collect()
}

/// Python package name normalization: lowercase, `_` and `.` become `-`.
pub fn normalize_py_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

/// Names from `gem list --local`: `name (1.0.0, 0.9.0)`.
pub fn gem_list_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter(|line| !line.starts_with("***"))
        .filter_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .collect()
}

/// Crates and versions from `cargo install --list`.
///
/// Top-level lines look like `ripgrep v14.1.0:`; indented lines list the
/// binaries a crate provides and are skipped.
pub fn cargo_installed(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter(|line| !line.starts_with(' ') && !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.trim_end_matches(':').split_whitespace();
            let name = parts.next()?;
            let version = parts.next()?.trim_start_matches('v');
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

/// Names from `apt list --installed`: `jq/stable,now 1.7 amd64 [installed]`.
pub fn apt_installed_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter_map(|line| line.split('/').next())
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Name/version pairs from `pipx list --short` or `uv tool list`.
pub fn name_version_pairs(output: &str) -> Vec<(String, String)> {
    clean_lines(output)
        .into_iter()
        .filter(|line| !line.starts_with('-'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.next().unwrap_or_default().trim_start_matches('v');
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

/// Crate names from `cargo search` output: `serde = "1.0.200"  # comment`.
pub fn cargo_search_names(output: &str) -> Vec<String> {
    clean_lines(output)
        .into_iter()
        .filter(|line| line.contains('='))
        .filter_map(|line| line.split_whitespace().next())
        .map(ToString::to_string)
        .collect()
}

#[derive(Deserialize)]
pub struct BrewInfoResponse {
    #[serde(default)]
    pub formulae: Vec<BrewFormula>,
    #[serde(default)]
    pub casks: Vec<BrewCask>,
}

#[derive(Deserialize)]
pub struct BrewFormula {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub installed: Vec<BrewInstalled>,
    #[serde(default)]
    pub versions: Option<BrewVersions>,
}

#[derive(Deserialize)]
pub struct BrewVersions {
    pub stable: Option<String>,
}

#[derive(Deserialize)]
pub struct BrewInstalled {
    pub version: String,
}

#[derive(Deserialize)]
pub struct BrewCask {
    pub token: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub installed: Option<String>,
}

/// Parses `brew info --installed --json=v2`, returning formula names (with
/// aliases) and cask tokens.
pub fn brew_json_names(output: &str) -> Result<Vec<String>, serde_json::Error> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let response: BrewInfoResponse = serde_json::from_str(output.trim())?;
    let mut names = Vec::new();
    for formula in &response.formulae {
        names.push(formula.name.clone());
        names.extend(formula.aliases.iter().cloned());
    }
    for cask in &response.casks {
        names.push(cask.token.clone());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_everywhere() {
        assert!(first_token_names("").is_empty());
        assert!(npm_parseable_names("").is_empty());
        assert!(pip_json_names("").unwrap().is_empty());
        assert!(pip_plain_names("").is_empty());
        assert!(gem_list_names("").is_empty());
        assert!(cargo_installed("").is_empty());
        assert!(apt_installed_names("").is_empty());
        assert!(name_version_pairs("").is_empty());
        assert!(brew_json_names("").unwrap().is_empty());
    }

    #[test]
    fn test_banner_lines_skipped() {
        let out = "WARNING: pip is old\nListing... Done\nrequests 2.31.0\n";
        assert_eq!(first_token_names(out), vec!["requests"]);
    }

    #[test]
    fn test_order_preserved() {
        let out = "zsh\nbat\nfzf\n";
        assert_eq!(first_token_names(out), vec!["zsh", "bat", "fzf"]);
    }

    #[test]
    fn test_npm_parseable_keeps_scoped_names() {
        let out = "/usr/local/lib\n/usr/local/lib/node_modules/@scope/pkg\n/usr/local/lib/node_modules/prettier\n";
        assert_eq!(npm_parseable_names(out), vec!["@scope/pkg", "prettier"]);
    }

    #[test]
    fn test_npm_parseable_drops_lib_segments() {
        let out = "/usr/local/lib/node_modules/lib\n";
        assert!(npm_parseable_names(out).is_empty());
    }

    #[test]
    fn test_pip_json() {
        let out = r#"[{"name": "Requests", "version": "2.31.0"}, {"name": "ruff_lsp", "version": "0.1"}]"#;
        assert_eq!(pip_json_names(out).unwrap(), vec!["requests", "ruff-lsp"]);
    }

    #[test]
    fn test_pip_plain_skips_header() {
        let out = "Package    Version\n---------- -------\nrequests   2.31.0\nruff       0.4.0\n";
        assert_eq!(pip_plain_names(out), vec!["requests", "ruff"]);
    }

    #[test]
    fn test_normalize_py_name() {
        assert_eq!(normalize_py_name("Ruff_LSP"), "ruff-lsp");
        assert_eq!(normalize_py_name("zope.interface"), "zope-interface");
    }

    #[test]
    fn test_gem_list() {
        let out = "*** LOCAL GEMS ***\n\nbundler (2.5.6)\nrake (13.1.0, 13.0.6)\n";
        assert_eq!(gem_list_names(out), vec!["bundler", "rake"]);
    }

    #[test]
    fn test_cargo_installed() {
        let out = "ripgrep v14.1.0:\n    rg\ncargo-edit v0.12.2:\n    cargo-add\n    cargo-rm\n";
        assert_eq!(
            cargo_installed(out),
            vec![
                ("ripgrep".to_string(), "14.1.0".to_string()),
                ("cargo-edit".to_string(), "0.12.2".to_string())
            ]
        );
    }

    #[test]
    fn test_apt_installed() {
        let out = "Listing... Done\njq/stable,now 1.7.1-1 amd64 [installed]\nwget/stable,now 1.21 amd64 [installed,automatic]\n";
        assert_eq!(apt_installed_names(out), vec!["jq", "wget"]);
    }

    #[test]
    fn test_name_version_pairs_skips_binary_lines() {
        let out = "ruff v0.4.0\n- ruff\nblack 24.0.0\n";
        assert_eq!(
            name_version_pairs(out),
            vec![
                ("ruff".to_string(), "0.4.0".to_string()),
                ("black".to_string(), "24.0.0".to_string())
            ]
        );
    }

    #[test]
    fn test_brew_json_names_includes_aliases_and_casks() {
        let out = r#"{
            "formulae": [
                {"name": "ripgrep", "aliases": ["rg"], "installed": [{"version": "14.1.0"}]}
            ],
            "casks": [{"token": "kitty"}]
        }"#;
        assert_eq!(brew_json_names(out).unwrap(), vec!["ripgrep", "rg", "kitty"]);
    }

    #[test]
    fn test_cargo_search_names() {
        let out = "serde = \"1.0.200\"    # A serialization framework\nserde_json = \"1.0.100\"  # JSON\n... and 100 more\n";
        assert_eq!(cargo_search_names(out), vec!["serde", "serde_json"]);
    }
}
