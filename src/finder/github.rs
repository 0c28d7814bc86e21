//! GitHub repository license lookup
//!
//! Uses `GET /repos/{owner}/{repo}/license`, which reports the license
//! GitHub detected for the repository's default branch. Only paths of the
//! form `github.com/<owner>/<repo>` are handled; anything else is declined.
//!
//! When GitHub classifies the license as `other`, the returned file is run
//! through the local [`LicenseClassifier`] instead.

use super::retry::RateLimitRetry;
use super::Finder;
use crate::engine::Cancellation;
use crate::license::{update_status, License, LicenseClassifier, StatusKind, StatusListener};
use crate::module::Module;
use crate::{GolicenseError, GolicenseResult};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API: &str = "https://api.github.com";

static GITHUB_REPO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^github\.com/([^/]+)/([^/]+)$").unwrap());
static RELEASE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?$").unwrap());
/// Timestamp and commit suffix of a Go pseudo-version
static PSEUDO_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{14}-[0-9a-f]{12}$").unwrap());

#[derive(Debug, Deserialize)]
struct RepoLicense {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    license: Option<LicenseInfo>,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    spdx_id: Option<String>,
}

impl RepoLicense {
    /// The license file's text, if GitHub sent one we can decode.
    fn text(&self) -> Option<String> {
        let content = self.content.as_deref()?;
        if self.encoding.as_deref().unwrap_or("base64") != "base64" {
            return Some(content.to_string());
        }

        let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        match base64::engine::general_purpose::STANDARD.decode(compact) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::debug!("undecodable license content: {}", e);
                None
            }
        }
    }
}

pub struct GithubFinder {
    client: reqwest::Client,
    api: String,
    token: Option<String>,
    cancel: Cancellation,
    classifier: LicenseClassifier,
}

impl GithubFinder {
    pub fn new(client: reqwest::Client, cancel: Cancellation) -> Self {
        Self {
            client,
            api: DEFAULT_API.to_string(),
            token: None,
            cancel,
            classifier: LicenseClassifier::new(),
        }
    }

    /// Use a different API root, e.g. a GitHub Enterprise instance.
    pub fn with_api(mut self, base: impl Into<String>) -> Self {
        self.api = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Authenticate requests; raises the rate limit considerably.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    async fn fetch(&self, owner: &str, repo: &str) -> GolicenseResult<RepoLicense> {
        let endpoint = format!("{}/repos/{}/{}/license", self.api, owner, repo);

        let mut request = self
            .client
            .get(&endpoint)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("golicense/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| GolicenseError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(wait) = rate_limit_wait(response.headers(), Utc::now()) {
                return Err(GolicenseError::RateLimited { wait });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GolicenseError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<RepoLicense>()
            .await
            .map_err(|source| GolicenseError::Http { endpoint, source })
    }
}

#[async_trait]
impl Finder for GithubFinder {
    fn name(&self) -> &str {
        "github"
    }

    async fn license(&self, module: &Module, status: Option<&dyn StatusListener>) -> GolicenseResult<Option<License>> {
        let Some(caps) = GITHUB_REPO.captures(&module.path) else {
            return Ok(None);
        };
        let (owner, repo) = (&caps[1], &caps[2]);

        let found = RateLimitRetry::new("GitHub", &self.cancel, status)
            .run(|| self.fetch(owner, repo))
            .await?;
        let Some(info) = &found.license else {
            return Ok(None);
        };

        let text = found.text();
        let url = pinned_url(owner, repo, found.path.as_deref(), &module.version).or(found.html_url.clone());

        if info.key == "other" {
            update_status(status, StatusKind::Normal, "detecting license from file contents");
            let detected = text.as_deref().and_then(|t| self.classifier.detect(t));
            return Ok(detected.map(|license| attach(license, url, text)));
        }

        let spdx_id = info
            .spdx_id
            .clone()
            .filter(|id| id != "NOASSERTION")
            .unwrap_or_default();
        Ok(Some(attach(License::new(info.name.clone(), spdx_id), url, text)))
    }
}

fn attach(mut license: License, url: Option<String>, text: Option<String>) -> License {
    if let Some(url) = url {
        license = license.with_url(url);
    }
    if let Some(text) = text {
        license = license.with_text(text);
    }
    license
}

/// License file URL pinned to the module's release tag. Pseudo-versions and
/// `+incompatible` versions don't name a usable tag.
fn pinned_url(owner: &str, repo: &str, file: Option<&str>, version: &str) -> Option<String> {
    if !RELEASE_TAG.is_match(version) || PSEUDO_VERSION.is_match(version) {
        return None;
    }
    Some(format!(
        "https://github.com/{}/{}/blob/{}/{}",
        owner,
        repo,
        version,
        file.unwrap_or("LICENSE")
    ))
}

/// How long a rejected request has to wait, if the rejection was a rate
/// limit. `retry-after` (secondary limits) wins over the primary limit's
/// reset time. Resets in the past mean no wait.
pub fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    if let Some(secs) = header("retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }

    if header("x-ratelimit-remaining") != Some("0") {
        return None;
    }
    let reset = header("x-ratelimit-reset")?.parse::<i64>().ok()?;
    let reset = DateTime::from_timestamp(reset, 0)?;
    Some((reset - now).to_std().unwrap_or(Duration::ZERO))
}
