//! SBOM generation: CycloneDX format
//!
//! Every module becomes a `library` component with a `pkg:golang` purl.
//! Licenses with a known SPDX id are emitted by id; otherwise the config's
//! override entry for the path is used by name, if there is one.

use super::Resolution;
use crate::policy::Config;
use crate::GolicenseResult;
use serde_json::json;

/// Render a CycloneDX 1.5 SBOM.
pub fn render_cyclonedx(entries: &[Resolution], config: &Config) -> GolicenseResult<String> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let components: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            json!({
                "type": "library",
                "name": e.module.path,
                "version": e.module.version,
                "purl": purl(&e.module.path, &e.module.version),
                "licenses": component_licenses(e, config),
            })
        })
        .collect();

    let sbom = json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "version": 1,
        "serialNumber": format!("urn:uuid:{}", uuid::Uuid::new_v4()),
        "metadata": {
            "timestamp": timestamp,
            "tools": [{
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }]
        },
        "components": components,
        "dependencies": []
    });

    Ok(serde_json::to_string_pretty(&sbom)?)
}

fn component_licenses(entry: &Resolution, config: &Config) -> serde_json::Value {
    let path = &entry.module.path;
    let url = config.sbom_license_urls.get(path);

    let spdx_id = entry
        .license
        .as_ref()
        .map(|l| l.spdx_id())
        .filter(|id| !id.is_empty() && entry.error.is_none());

    let mut license = match (spdx_id, config.overrides.get(path)) {
        (Some(id), _) => json!({ "id": id }),
        (None, Some(name)) => json!({ "name": name }),
        (None, None) => return json!([]),
    };
    if let Some(url) = url {
        license["url"] = json!(url);
    }

    json!([{ "license": license }])
}

/// Package URL for a Go module: the last path segment is the name, the rest
/// the namespace, and the version loses its `v` prefix.
pub fn purl(path: &str, version: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    match path.rsplit_once('/') {
        Some((namespace, name)) => format!("pkg:golang/{}/{}@{}", namespace, name, version),
        None => format!("pkg:golang/{}@{}", path, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::License;
    use crate::module::Module;
    use crate::policy::AllowState;
    use std::collections::HashMap;

    fn entry(path: &str, license: Option<License>, error: Option<&str>) -> Resolution {
        Resolution {
            module: Module::new(path, "v1.2.3", ""),
            license,
            error: error.map(String::from),
            state: AllowState::Unknown,
        }
    }

    #[test]
    fn test_purl() {
        assert_eq!(purl("github.com/foo/bar", "v1.2.3"), "pkg:golang/github.com/foo/bar@1.2.3");
        assert_eq!(purl("rsc.io", "1.0.0"), "pkg:golang/rsc.io@1.0.0");
    }

    #[test]
    fn test_render_cyclonedx() {
        let config = Config {
            overrides: HashMap::from([("rsc.io/pdf".to_string(), "BSD-3-Clause".to_string())]),
            sbom_license_urls: HashMap::from([(
                "github.com/foo/bar".to_string(),
                "https://example.com/LICENSE".to_string(),
            )]),
            ..Default::default()
        };
        let entries = vec![
            entry("github.com/foo/bar", Some(License::new("MIT License", "MIT")), None),
            entry("github.com/foo/unknown", None, None),
            entry("rsc.io/pdf", None, Some("lookup failed")),
        ];

        let out: serde_json::Value =
            serde_json::from_str(&render_cyclonedx(&entries, &config).unwrap()).unwrap();
        assert_eq!(out["bomFormat"], "CycloneDX");
        assert!(out["serialNumber"].as_str().unwrap().starts_with("urn:uuid:"));

        let components = out["components"].as_array().unwrap();
        assert_eq!(components.len(), 3);
        assert_eq!(components[0]["purl"], "pkg:golang/github.com/foo/bar@1.2.3");
        assert_eq!(components[0]["licenses"][0]["license"]["id"], "MIT");
        assert_eq!(components[0]["licenses"][0]["license"]["url"], "https://example.com/LICENSE");
        assert_eq!(components[1]["licenses"], json!([]));
        assert_eq!(components[2]["licenses"][0]["license"]["name"], "BSD-3-Clause");
    }
}
