//! Configured path rewrite map
//!
//! Keys are exact import paths, or regular expressions when wrapped in
//! slashes (`/^gopkg\.in/(.*)$/`). Values may reference capture groups with
//! `\1`, `\2`, ... Rewriting repeats until no rule applies; a rule set that
//! keeps rewriting for more rounds than it has rules is treated as cyclic
//! and the translation is abandoned.

use super::Translator;
use crate::license::StatusListener;
use crate::module::Module;
use crate::{GolicenseError, GolicenseResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

enum Rule {
    Exact { from: String, to: String },
    Pattern { re: Regex, to: String },
}

pub struct MapTranslator {
    rules: Vec<Rule>,
}

impl MapTranslator {
    /// Compile the rewrite map. Rules are tried in key order.
    pub fn new(map: &HashMap<String, String>) -> GolicenseResult<Self> {
        let ordered: BTreeMap<&String, &String> = map.iter().collect();
        let mut rules = Vec::with_capacity(ordered.len());

        for (from, to) in ordered {
            let rule = match pattern_body(from) {
                Some(body) => Rule::Pattern {
                    re: Regex::new(body).map_err(|source| GolicenseError::Pattern {
                        pattern: from.clone(),
                        source,
                    })?,
                    to: to.clone(),
                },
                None => Rule::Exact {
                    from: from.clone(),
                    to: to.clone(),
                },
            };
            rules.push(rule);
        }

        Ok(Self { rules })
    }

    /// Rewrite `path` to a fixed point. `None` when no rule applied or the
    /// rules did not settle.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let mut current = path.to_string();
        let mut rounds = 0usize;

        'restart: loop {
            if rounds > self.rules.len() {
                tracing::warn!("translation of {} did not settle, ignoring", path);
                return None;
            }

            for rule in &self.rules {
                if let Some(next) = rule.apply(&current) {
                    current = next;
                    rounds += 1;
                    continue 'restart;
                }
            }

            break;
        }

        (rounds > 0).then_some(current)
    }
}

impl Rule {
    fn apply(&self, path: &str) -> Option<String> {
        match self {
            Self::Exact { from, to } => (from == path).then(|| to.clone()),
            Self::Pattern { re, to } => {
                let caps = re.captures(path)?;
                let mut out = to.clone();
                // Highest group first so `\1` does not clobber `\10`
                for i in (0..caps.len()).rev() {
                    let value = caps.get(i).map(|m| m.as_str()).unwrap_or("");
                    out = out.replace(&format!("\\{}", i), value);
                }
                Some(out)
            }
        }
    }
}

fn pattern_body(key: &str) -> Option<&str> {
    if key.len() >= 2 && key.starts_with('/') && key.ends_with('/') {
        Some(&key[1..key.len() - 1])
    } else {
        None
    }
}

#[async_trait]
impl Translator for MapTranslator {
    fn name(&self) -> &str {
        "mapper"
    }

    async fn translate(&self, module: &Module, _status: Option<&dyn StatusListener>) -> Option<Module> {
        self.rewrite(&module.path).map(|path| module.with_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_map_declines() {
        let t = MapTranslator::new(&HashMap::new()).unwrap();
        assert_eq!(t.rewrite("github.com/foo/bar"), None);
    }

    #[test]
    fn test_exact_rewrite() {
        let t = MapTranslator::new(&map(&[("gopkg.in/pkg.v3", "github.com/go-pkg/pkg")])).unwrap();
        assert_eq!(t.rewrite("gopkg.in/pkg.v3").as_deref(), Some("github.com/go-pkg/pkg"));
    }

    #[test]
    fn test_regex_backreferences() {
        let t = MapTranslator::new(&map(&[(r"/^gopkg\.in/([^/]+)/([^/]+)\./", r"github.com/\1/\2")])).unwrap();
        assert_eq!(
            t.rewrite("gopkg.in/cloudentity/foo.v22").as_deref(),
            Some("github.com/cloudentity/foo")
        );
    }

    #[test]
    fn test_chained_rules_settle() {
        let t = MapTranslator::new(&map(&[("a.io/x", "b.io/x"), ("b.io/x", "github.com/o/x")])).unwrap();
        assert_eq!(t.rewrite("a.io/x").as_deref(), Some("github.com/o/x"));
    }

    #[test]
    fn test_cycle_is_abandoned() {
        let t = MapTranslator::new(&map(&[("a.io/x", "b.io/x"), ("b.io/x", "a.io/x")])).unwrap();
        assert_eq!(t.rewrite("a.io/x"), None);

        let self_feeding = MapTranslator::new(&map(&[("/^(.*)$/", r"x/\1")])).unwrap();
        assert_eq!(self_feeding.rewrite("a"), None);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = MapTranslator::new(&map(&[("/(unclosed/", "x")])).err().unwrap();
        assert!(matches!(err, GolicenseError::Pattern { .. }));
    }

    #[tokio::test]
    async fn test_translate_keeps_version() {
        let t = MapTranslator::new(&map(&[("a.io/x", "github.com/o/x")])).unwrap();
        let m = Module::new("a.io/x", "v1.2.3", "h1:q");
        let out = t.translate(&m, None).await.unwrap();
        assert_eq!(out, Module::new("github.com/o/x", "v1.2.3", "h1:q"));
    }
}
