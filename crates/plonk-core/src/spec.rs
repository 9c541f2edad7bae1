//! Package spec parsing: `[manager:]name[@version]`.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// A parsed package reference.
///
/// Scoped npm names keep their leading `@`: `npm:@scope/pkg@1.0.0` parses
/// into manager `npm`, name `@scope/pkg`, version `1.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    pub manager: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parses a spec string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSpec`] for empty input, an empty
    /// manager prefix, or an empty name.
    pub fn parse(spec: &str) -> CoreResult<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(CoreError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty spec".to_string(),
            });
        }

        let (manager, rest) = match spec.split_once(':') {
            Some((prefix, rest)) => {
                if prefix.is_empty() {
                    return Err(CoreError::InvalidSpec {
                        spec: spec.to_string(),
                        reason: "empty manager prefix".to_string(),
                    });
                }
                (Some(prefix.to_string()), rest)
            }
            None => (None, spec),
        };

        if rest.is_empty() {
            return Err(CoreError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty package name".to_string(),
            });
        }

        // A leading '@' belongs to a scoped name, so only an '@' past the
        // first character separates the version.
        let (name, version) = match rest[1..].rfind('@') {
            Some(idx) => {
                let (name, version) = rest.split_at(idx + 1);
                (name, Some(version[1..].to_string()))
            }
            None => (rest, None),
        };

        if name.is_empty() {
            return Err(CoreError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty package name".to_string(),
            });
        }
        if version.as_deref() == Some("") {
            return Err(CoreError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty version".to_string(),
            });
        }

        Ok(Self {
            manager,
            name: name.to_string(),
            version,
        })
    }

    /// The manager to use, given the configured default.
    pub fn manager_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.manager.as_deref().unwrap_or(default)
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(manager) = &self.manager {
            write!(f, "{manager}:")?;
        }
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}
