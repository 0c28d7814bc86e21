//! Concatenated license texts
//!
//! Produces a single notice file with the full text of every resolved
//! license, suitable for shipping alongside a binary.

use super::Resolution;

const SEPARATOR: &str = "--------------------------------------------------------------------------------";

/// Render every module's license text, separated by a rule.
pub fn render(entries: &[Resolution]) -> String {
    let mut out = String::new();

    for entry in entries {
        out.push_str(&format!("{} - {}\n", entry.module.path, entry.module.version));

        match &entry.license {
            Some(license) => {
                if !license.spdx_id().is_empty() {
                    out.push_str(&format!("SPDX-License-Identifier: {}\n", license.spdx_id()));
                }
                if let Some(url) = &license.url {
                    out.push_str(&format!("{}\n", url));
                }
                out.push('\n');
                if license.text().is_empty() {
                    out.push_str("(license text unavailable)\n");
                } else {
                    out.push_str(license.text().trim_end());
                    out.push('\n');
                }
            }
            None => out.push_str("\n(license not found)\n"),
        }

        out.push_str(SEPARATOR);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::License;
    use crate::module::Module;
    use crate::policy::AllowState;

    #[test]
    fn test_render_license_texts() {
        let entries = vec![
            Resolution {
                module: Module::new("github.com/foo/bar", "v1.2.0", ""),
                license: Some(License::new("MIT License", "MIT").with_text("MIT License\n\nCopyright (c) Foo\n\n")),
                error: None,
                state: AllowState::Unknown,
            },
            Resolution {
                module: Module::new("rsc.io/pdf", "v0.1.1", ""),
                license: None,
                error: None,
                state: AllowState::Unknown,
            },
        ];

        let out = render(&entries);
        assert!(out.starts_with("github.com/foo/bar - v1.2.0\nSPDX-License-Identifier: MIT\n\nMIT License\n\nCopyright (c) Foo\n---"));
        assert!(out.contains("rsc.io/pdf - v0.1.1\n\n(license not found)\n"));
        assert_eq!(out.matches(SEPARATOR).count(), 2);
    }
}
