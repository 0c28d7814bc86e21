//! Markdown report renderer
//!
//! One table row per module. Column order follows `output_columns` from the
//! config when set.

use super::Resolution;
use crate::policy::Config;

/// A table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Dependency,
    Version,
    SpdxId,
    License,
    Allowed,
}

pub const DEFAULT_COLUMNS: &[Column] = &[
    Column::Dependency,
    Column::Version,
    Column::SpdxId,
    Column::License,
    Column::Allowed,
];

impl Column {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "dependency" | "module" | "path" => Some(Self::Dependency),
            "version" => Some(Self::Version),
            "spdx id" | "spdx" | "spdxid" => Some(Self::SpdxId),
            "license" => Some(Self::License),
            "allowed" => Some(Self::Allowed),
            _ => None,
        }
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::Dependency => "Dependency",
            Self::Version => "Version",
            Self::SpdxId => "SPDX ID",
            Self::License => "License",
            Self::Allowed => "Allowed",
        }
    }

    pub(crate) fn cell(self, entry: &Resolution) -> String {
        match self {
            Self::Dependency => entry.module.path.clone(),
            Self::Version => entry.module.version.clone(),
            Self::SpdxId => entry
                .license
                .as_ref()
                .map(|l| l.spdx_id().to_string())
                .unwrap_or_default(),
            Self::License => match (&entry.error, &entry.license) {
                (Some(err), _) => format!("ERROR: {}", err),
                (None, Some(license)) => license.name().to_string(),
                (None, None) => String::new(),
            },
            Self::Allowed => entry.state.as_report_str().to_string(),
        }
    }
}

/// Columns configured by `output_columns`, or the defaults.
pub fn columns(config: &Config) -> Vec<Column> {
    let configured: Vec<Column> = config
        .output_columns
        .iter()
        .filter_map(|name| {
            let col = Column::parse(name);
            if col.is_none() {
                tracing::warn!("ignoring unknown output column {:?}", name);
            }
            col
        })
        .collect();

    if configured.is_empty() {
        DEFAULT_COLUMNS.to_vec()
    } else {
        configured
    }
}

/// Render results as a Markdown document.
pub fn render(entries: &[Resolution], config: &Config) -> String {
    let columns = columns(config);
    let mut md = String::with_capacity(256 + entries.len() * 96);

    md.push_str("# Licenses\n\n");

    md.push('|');
    for col in &columns {
        md.push_str(&format!(" {} |", col.title()));
    }
    md.push_str("\n|");
    for _ in &columns {
        md.push_str(" --- |");
    }
    md.push('\n');

    for entry in entries {
        md.push('|');
        for col in &columns {
            md.push_str(&format!(" {} |", escape_cell(&col.cell(entry))));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace("\r\n", "<br/>").replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::License;
    use crate::module::Module;
    use crate::policy::AllowState;

    fn entries() -> Vec<Resolution> {
        vec![
            Resolution {
                module: Module::new("github.com/foo/bar", "v1.2.0", ""),
                license: Some(License::new("MIT License", "MIT")),
                error: None,
                state: AllowState::Allowed,
            },
            Resolution {
                module: Module::new("rsc.io/pdf", "v0.1.1", ""),
                license: None,
                error: Some("2 errors occurred:\n\t* one\n\t* two".into()),
                state: AllowState::Denied,
            },
        ]
    }

    #[test]
    fn test_render_default_columns() {
        let md = render(&entries(), &Config::default());
        assert!(md.starts_with("# Licenses\n\n"));
        assert!(md.contains("| Dependency | Version | SPDX ID | License | Allowed |"));
        assert!(md.contains("| github.com/foo/bar | v1.2.0 | MIT | MIT License | yes |"));
    }

    #[test]
    fn test_render_error_stays_on_one_row() {
        let md = render(&entries(), &Config::default());
        let row = md.lines().find(|l| l.contains("rsc.io/pdf")).unwrap();
        assert!(row.contains("ERROR: 2 errors occurred:<br/>\t* one<br/>\t* two"));
        assert!(row.ends_with("| no |"));
    }

    #[test]
    fn test_render_configured_columns() {
        let config = Config {
            output_columns: vec!["license".into(), "dependency".into(), "bogus".into()],
            ..Default::default()
        };
        let md = render(&entries(), &config);
        assert!(md.contains("| License | Dependency |\n| --- | --- |\n"));
        assert!(md.contains("| MIT License | github.com/foo/bar |"));
    }
}
