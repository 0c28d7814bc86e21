//! Policy configuration: allow/deny rules, overrides and translations
//!
//! Loaded from a `.toml` or `.json` file. Every field is optional, so an
//! empty file is a valid (rule-less) configuration.
//!
//! ```toml
//! allow = ["MIT", "Apache-2.0"]
//! deny = ["GNU General Public License v3.0"]
//! approved = ["github.com/internal/tool"]
//!
//! [override]
//! "github.com/foo/bar" = "BSD-3-Clause"
//!
//! [translate]
//! "gopkg.in/yaml.v2" = "github.com/go-yaml/yaml"
//! ```

use crate::license::License;
use crate::module::Module;
use crate::{GolicenseError, GolicenseResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// License names or SPDX ids that are allowed
    pub allow: Vec<String>,

    /// License names or SPDX ids that are denied; wins over `allow`
    pub deny: Vec<String>,

    /// Import path → SPDX id, consulted before any remote lookup
    #[serde(rename = "override")]
    pub overrides: HashMap<String, String>,

    /// Module paths accepted regardless of their license
    pub approved: Vec<String>,

    /// Import path rewrites; keys wrapped in `/.../` are regexes
    pub translate: HashMap<String, String>,

    /// Import path → license URL, used by the SBOM when none is known
    #[serde(alias = "sbomLicenseURLs")]
    pub sbom_license_urls: HashMap<String, String>,

    /// Column order for tabular reports
    #[serde(alias = "outputColumns")]
    pub output_columns: Vec<String>,
}

/// Verdict of the allow/deny rules for one license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowState {
    Unknown,
    Allowed,
    Denied,
}

impl AllowState {
    /// Short form used in tabular reports.
    pub fn as_report_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Allowed => "yes",
            Self::Denied => "no",
        }
    }
}

impl fmt::Display for AllowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

impl Config {
    /// Load a config, picking the format from the file extension.
    pub fn from_file(path: &Path) -> GolicenseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let config = match ext.as_deref() {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => {
                return Err(GolicenseError::Config(format!(
                    "unsupported config format for {} (expected .toml or .json)",
                    path.display()
                )))
            }
        };

        tracing::info!(
            "Loaded config from {} ({} allowed, {} denied, {} overrides, {} translations)",
            path.display(),
            config.allow.len(),
            config.deny.len(),
            config.overrides.len(),
            config.translate.len()
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> GolicenseResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> GolicenseResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Whether any allow or deny rule is configured.
    pub fn has_rules(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty()
    }

    /// Evaluate the allow/deny lists for `license`.
    pub fn allowed(&self, license: Option<&License>) -> AllowState {
        let Some(license) = license else {
            return AllowState::Unknown;
        };

        if matches_any(&self.deny, license) {
            return AllowState::Denied;
        }
        if matches_any(&self.allow, license) {
            return AllowState::Allowed;
        }
        AllowState::Unknown
    }

    /// Verdict for a resolved module, taking pre-approvals into account.
    /// A failed lookup counts as a module without a license, so it is never
    /// allowed.
    pub fn module_state(
        &self,
        module: &Module,
        license: Option<&License>,
        error: Option<&GolicenseError>,
    ) -> AllowState {
        if self.approved.iter().any(|p| p == &module.path) {
            return AllowState::Allowed;
        }
        if error.is_some() {
            return self.allowed(None);
        }
        self.allowed(license)
    }
}

fn matches_any(rules: &[String], license: &License) -> bool {
    rules.iter().any(|rule| {
        (!license.name().is_empty() && rule.eq_ignore_ascii_case(license.name()))
            || (!license.spdx_id().is_empty() && rule.eq_ignore_ascii_case(license.spdx_id()))
    })
}
