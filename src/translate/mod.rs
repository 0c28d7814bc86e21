//! Import path translation
//!
//! Many Go modules are imported through vanity or redirecting hosts
//! (`gopkg.in`, `golang.org/x`, custom domains) that no license source
//! understands. Translators rewrite such paths into the canonical forge
//! location. A translator either declines (`None`) or proposes a new
//! [`Module`]; the input is never modified.
//!
//! ## Chain order
//!
//! 1. [`mapper`]: user-configured rewrite map
//! 2. [`resolver`]: `?go-get=1` VCS root discovery
//! 3. [`golang`]: `golang.org/x/*` → `github.com/golang/*`
//! 4. [`gopkg`]: `gopkg.in/*` → `github.com/*`

pub mod golang;
pub mod gopkg;
pub mod mapper;
pub mod resolver;

pub use golang::GolangTranslator;
pub use gopkg::GopkgTranslator;
pub use mapper::MapTranslator;
pub use resolver::VcsResolver;

use crate::license::StatusListener;
use crate::module::Module;
use async_trait::async_trait;

/// A path rewrite strategy.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Propose a rewritten module, or `None` to decline.
    async fn translate(&self, module: &Module, status: Option<&dyn StatusListener>) -> Option<Module>;
}

/// Ordered list of translators. Every translator runs against the output of
/// the ones before it.
#[derive(Default)]
pub struct TranslatorChain {
    translators: Vec<Box<dyn Translator>>,
}

impl TranslatorChain {
    pub fn new(translators: Vec<Box<dyn Translator>>) -> Self {
        Self { translators }
    }

    pub fn push(&mut self, translator: impl Translator + 'static) {
        self.translators.push(Box::new(translator));
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// Apply every translator in order. Returns the final module and whether
    /// any translator fired; when none did, the input comes back unchanged.
    pub async fn translate(&self, module: &Module, status: Option<&dyn StatusListener>) -> (Module, bool) {
        let mut current = module.clone();
        let mut applied = false;

        for translator in &self.translators {
            if let Some(next) = translator.translate(&current, status).await {
                tracing::debug!(
                    "{}: translated {} to {}",
                    translator.name(),
                    current.path,
                    next.path
                );
                current = next;
                applied = true;
            }
        }

        (current, applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn offline_chain(map: HashMap<String, String>) -> TranslatorChain {
        let mut chain = TranslatorChain::default();
        chain.push(MapTranslator::new(&map).unwrap());
        chain.push(GolangTranslator);
        chain.push(GopkgTranslator);
        chain
    }

    #[tokio::test]
    async fn test_chain_rewrites_well_known_hosts() {
        let chain = offline_chain(HashMap::new());
        let cases = [
            ("golang.org/x/crypto", "github.com/golang/crypto"),
            ("gopkg.in/yaml.v3", "github.com/go-yaml/yaml"),
            ("gopkg.in/mitchellh/foo.v22", "github.com/mitchellh/foo"),
        ];

        for (input, expected) in cases {
            let module = Module::new(input, "v1.0.0", "h1:abc");
            let (out, applied) = chain.translate(&module, None).await;
            assert!(applied, "{} should translate", input);
            assert_eq!(out.path, expected);
            assert_eq!(out.version, "v1.0.0");
            assert_eq!(module.path, input);
        }
    }

    #[tokio::test]
    async fn test_chain_leaves_canonical_path() {
        let chain = offline_chain(HashMap::new());
        let module = Module::new("github.com/foo/bar", "v1.0.0", "");
        let (out, applied) = chain.translate(&module, None).await;
        assert!(!applied);
        assert_eq!(out, module);
    }

    #[tokio::test]
    async fn test_later_translator_sees_earlier_output() {
        let mut map = HashMap::new();
        map.insert("example.com/yaml".to_string(), "gopkg.in/yaml.v2".to_string());
        let chain = offline_chain(map);

        let (out, applied) = chain
            .translate(&Module::new("example.com/yaml", "v2.4.0", ""), None)
            .await;
        assert!(applied);
        assert_eq!(out.path, "github.com/go-yaml/yaml");
    }
}
