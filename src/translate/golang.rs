//! `golang.org/x/*` → `github.com/golang/*`
//!
//! The Go sub-repositories are served from `golang.org/x` (vanity) and
//! `go.googlesource.com` (origin) but mirrored on GitHub, which is where
//! license lookups work.

use super::Translator;
use crate::license::StatusListener;
use crate::module::Module;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static GOLANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:golang\.org/x|go\.googlesource\.com)/([^/]+)$").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct GolangTranslator;

#[async_trait]
impl Translator for GolangTranslator {
    fn name(&self) -> &str {
        "golang"
    }

    async fn translate(&self, module: &Module, _status: Option<&dyn StatusListener>) -> Option<Module> {
        let caps = GOLANG.captures(&module.path)?;
        Some(module.with_path(format!("github.com/golang/{}", &caps[1])))
    }
}
