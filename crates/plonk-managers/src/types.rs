use serde::Serialize;

/// Detailed information about a package, installed or not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub installed: bool,
    pub manager: String,
}

/// Outcome of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Pass,
    Warn,
    Fail,
}

/// One entry of a doctor report.
///
/// Health checks never fail the command that requested them; an absent
/// manager binary yields [`HealthStatus::Warn`], not `Fail`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub category: String,
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl HealthCheck {
    pub fn pass(name: &str, category: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            status: HealthStatus::Pass,
            message: message.into(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            details: Vec::new(),
        }
    }

    pub fn warn(name: &str, category: &str, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Warn,
            ..Self::pass(name, category, message)
        }
    }

    pub fn fail(name: &str, category: &str, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Fail,
            ..Self::pass(name, category, message)
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}
