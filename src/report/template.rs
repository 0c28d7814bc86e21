//! User-supplied template report
//!
//! The template is a Handlebars file rendered once over every result. Output
//! is written verbatim, without HTML escaping, so any text format works.
//!
//! Each item of `entries` has `dependency`, `version`, `spdx`, `license`,
//! `allowed`, `url` and `error` fields. `allowed` is `yes`, `no` or
//! `unknown`. Missing values are empty strings.

use super::Resolution;
use crate::{GolicenseError, GolicenseResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TemplateEntry<'a> {
    dependency: &'a str,
    version: &'a str,
    spdx: &'a str,
    license: &'a str,
    allowed: &'static str,
    url: &'a str,
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateData<'a> {
    entries: Vec<TemplateEntry<'a>>,
}

/// Render results through the template file at `path`.
pub fn render(entries: &[Resolution], path: &Path) -> GolicenseResult<String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| GolicenseError::Output(format!("reading template {}: {}", path.display(), e)))?;
    render_str(entries, &source)
        .map_err(|e| GolicenseError::Output(format!("rendering template {}: {}", path.display(), e)))
}

/// Render results through an in-memory template.
pub fn render_str(entries: &[Resolution], source: &str) -> Result<String, handlebars::RenderError> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);

    let data = TemplateData {
        entries: entries
            .iter()
            .map(|e| TemplateEntry {
                dependency: &e.module.path,
                version: &e.module.version,
                spdx: e.license.as_ref().map(|l| l.spdx_id()).unwrap_or_default(),
                license: e.license.as_ref().map(|l| l.name()).unwrap_or_default(),
                allowed: e.state.as_report_str(),
                url: e.license.as_ref().and_then(|l| l.url.as_deref()).unwrap_or_default(),
                error: e.error.as_deref().unwrap_or_default(),
            })
            .collect(),
    };

    hb.render_template(source, &data)
}
