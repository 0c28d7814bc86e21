//! VCS root discovery for custom import paths
//!
//! Performs the same lookup `go get` does: request `https://<path>?go-get=1`
//! and read the `go-import` meta tag, which names the repository that hosts
//! the path. For example `rsc.io/pdf` resolves to `github.com/rsc/pdf`.
//! Paths on well-known forges are resolved locally without a request.

use super::Translator;
use crate::license::{update_status, StatusKind, StatusListener};
use crate::module::Module;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static META_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());
static ATTR_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bname\s*=\s*["']([^"']*)["']"#).unwrap());
static ATTR_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bcontent\s*=\s*["']([^"']*)["']"#).unwrap());
static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+://").unwrap());

/// Hosts whose repository root is always the first three path segments.
const KNOWN_FORGES: &[&str] = &["github.com", "bitbucket.org"];

/// A `go-import` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMeta {
    pub prefix: String,
    pub vcs: String,
    pub repo: String,
}

pub struct VcsResolver {
    client: reqwest::Client,
    scheme: &'static str,
}

impl VcsResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "https",
        }
    }

    /// Query over plain HTTP. Only meant for local test servers.
    pub fn insecure(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// Repository root for `path`, without scheme.
    pub async fn repo_root(&self, path: &str) -> Option<String> {
        if let Some(root) = forge_root(path) {
            return Some(root);
        }

        let url = format!("{}://{}?go-get=1", self.scheme, path);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("go-get discovery for {} failed: {}", path, e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!("go-get discovery for {} returned {}", path, response.status());
            return None;
        }
        let body = response.text().await.ok()?;

        let meta = parse_go_import(&body)
            .into_iter()
            .filter(|m| m.vcs != "mod")
            .find(|m| path_has_prefix(path, &m.prefix))?;

        let repo = SCHEME.replace(&meta.repo, "");
        Some(repo.trim_end_matches(".git").trim_end_matches('/').to_string())
    }
}

#[async_trait]
impl Translator for VcsResolver {
    fn name(&self) -> &str {
        "resolver"
    }

    async fn translate(&self, module: &Module, status: Option<&dyn StatusListener>) -> Option<Module> {
        let root = self.repo_root(&module.path).await?;
        if root == module.path {
            return None;
        }

        update_status(
            status,
            StatusKind::Normal,
            &format!("translated {:?} to {:?}", module.path, root),
        );
        Some(module.with_path(root))
    }
}

fn forge_root(path: &str) -> Option<String> {
    let mut parts = path.splitn(4, '/');
    let host = parts.next()?;
    if !KNOWN_FORGES.contains(&host) {
        return None;
    }
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some(format!("{}/{}/{}", host, owner, repo))
}

/// Extract all `go-import` meta declarations from an HTML page.
pub fn parse_go_import(html: &str) -> Vec<ImportMeta> {
    META_TAG
        .find_iter(html)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let name = ATTR_NAME.captures(tag)?;
            if &name[1] != "go-import" {
                return None;
            }
            let content = ATTR_CONTENT.captures(tag)?;
            let fields: Vec<&str> = content[1].split_whitespace().collect();
            match fields.as_slice() {
                [prefix, vcs, repo] => Some(ImportMeta {
                    prefix: prefix.to_string(),
                    vcs: vcs.to_string(),
                    repo: repo.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'))
}
