//! `gopkg.in` → GitHub
//!
//! `gopkg.in/user/pkg.vN` lives at `github.com/user/pkg`; the short form
//! `gopkg.in/pkg.vN` lives at `github.com/go-pkg/pkg`.

use super::Translator;
use crate::license::StatusListener;
use crate::module::Module;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Mirrors the path grammar gopkg.in itself accepts.
static GOPKG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^gopkg\.in/(?:([a-zA-Z0-9][-a-zA-Z0-9]+)/)?([a-zA-Z][-.a-zA-Z0-9]*)\.((?:v0|v[1-9][0-9]*)(?:\.0|\.[1-9][0-9]*){0,2}(?:-unstable)?)(?:\.git)?((?:/[a-zA-Z0-9][-.a-zA-Z0-9]*)*)$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct GopkgTranslator;

#[async_trait]
impl Translator for GopkgTranslator {
    fn name(&self) -> &str {
        "gopkg"
    }

    async fn translate(&self, module: &Module, _status: Option<&dyn StatusListener>) -> Option<Module> {
        let caps = GOPKG.captures(&module.path)?;
        let name = &caps[2];
        let owner = match caps.get(1) {
            Some(user) => user.as_str().to_string(),
            None => format!("go-{}", name),
        };
        Some(module.with_path(format!("github.com/{}/{}", owner, name)))
    }
}
