//! JSON report renderer

use super::Resolution;
use crate::GolicenseResult;
use serde_json::json;

/// Render results as a pretty-printed JSON array.
pub fn render(entries: &[Resolution]) -> GolicenseResult<String> {
    let rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            json!({
                "path": e.module.path,
                "version": e.module.version,
                "hash": e.module.hash,
                "spdx_id": e.license.as_ref().and_then(|l| l.spdx_id.clone()),
                "license": e.license.as_ref().and_then(|l| l.name.clone()),
                "url": e.license.as_ref().and_then(|l| l.url.clone()),
                "allowed": e.state,
                "error": e.error,
            })
        })
        .collect();

    Ok(serde_json::to_string_pretty(&rows)?)
}
