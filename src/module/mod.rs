//! Module identities: the unit of work for license resolution
//!
//! A [`Module`] is the (path, version, hash) triple recorded for one
//! dependency in a Go binary's build information. Modules are immutable once
//! parsed; translation produces new values instead of rewriting these.
//!
//! Listings come from a compiled binary ([`buildinfo`]) or from the text
//! `go version -m` prints.

pub mod buildinfo;

use crate::{GolicenseError, GolicenseResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single Go module dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Module {
    /// Import path, e.g. `github.com/fatih/color`
    pub path: String,
    /// Version such as `v1.2.3`
    pub version: String,
    /// Content hash such as `h1:abcd1234=`, empty when the binary had none
    pub hash: String,
}

impl Module {
    pub fn new(path: impl Into<String>, version: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            hash: hash.into(),
        }
    }

    /// Copy of this module with a different import path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: self.version.clone(),
            hash: self.hash.clone(),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.version)
    }
}

/// Trailing major-version suffix like `/v12` on a module-aware import path.
static IMPORT_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"/v\d+$").unwrap());

/// Parse the dependency listing from a Go binary's build information.
///
/// Accepts the raw embedded text as well as `go version -m` output, where
/// every row is indented by a tab and the first line names the binary.
/// Rows other than `dep` and `=>` (replacement of the preceding `dep`) are
/// ignored.
pub fn parse_build_info(raw: &str) -> GolicenseResult<Vec<Module>> {
    let mut result: Vec<Module> = Vec::new();

    for line in raw.trim().lines() {
        let mut row: Vec<&str> = line.trim_start().split('\t').collect();
        if row[0] != "dep" && row[0] != "=>" {
            continue;
        }

        // No hash recorded for this dependency
        if row.len() == 3 {
            row.push("");
        }
        if row.len() != 4 {
            return Err(GolicenseError::BuildInfo(line.trim().to_string()));
        }

        let path = match IMPORT_VERSION.find(row[1]) {
            Some(m) => &row[1][..m.start()],
            None => row[1],
        };
        let next = Module::new(path, row[2], row[3]);

        if row[0] == "=>" {
            match result.last_mut() {
                Some(last) => *last = next,
                None => return Err(GolicenseError::BuildInfo(line.trim().to_string())),
            }
            continue;
        }

        result.push(next);
    }

    Ok(result)
}

/// Modules listed in one input: a compiled Go binary, or the build-info
/// text printed by `go version -m`.
pub fn read_modules(raw: &[u8]) -> GolicenseResult<Vec<Module>> {
    if buildinfo::is_go_binary(raw) {
        let info = buildinfo::read_build_info(raw)?;
        tracing::debug!("read build info of a {} binary", info.go_version);
        return parse_build_info(&info.modules);
    }

    let text = std::str::from_utf8(raw)
        .map_err(|_| GolicenseError::Binary("input is neither a Go binary nor a build-info listing".into()))?;
    parse_build_info(text)
}

/// Deduplicated set of modules collected from one or more binaries.
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: BTreeSet<Module>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) -> bool {
        self.modules.insert(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Modules ordered by path, then version, then hash.
    pub fn into_sorted(self) -> Vec<Module> {
        self.modules.into_iter().collect()
    }
}

impl Extend<Module> for ModuleSet {
    fn extend<I: IntoIterator<Item = Module>>(&mut self, iter: I) {
        self.modules.extend(iter);
    }
}

impl FromIterator<Module> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}

/// Sort modules by import path, breaking ties by version.
pub fn sort_by_path(modules: &mut [Module]) {
    modules.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.version.cmp(&b.version)));
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXE_DATA: &str = "path\tgithub.com/mitchellh/golicense
mod\tgithub.com/mitchellh/golicense\t(devel)\t
dep\tgithub.com/fatih/color\tv1.7.0\th1:DkWD4oS2D8LGGgTQ6IvwJJXSL5Vp2ffcQg58nFV38Ys=
dep\tgithub.com/mattn/go-colorable\tv0.0.9\th1:UVL0vNpWh04HeJXV0KLcaT7r06gOH2l4OW6ddYRUIY4=
dep\tgithub.com/rsc/goversion/v12\tv12.0.0\th1:zVF4y5ciA/rw779S62bEAq4Yif1cBc/UwRkXJ2xZyT4=
dep\tgolang.org/x/sys\tv0.0.0-20180909124046-d0be0721c37e\t";

    #[test]
    fn test_parse_typical() {
        let mods = parse_build_info(EXE_DATA).unwrap();
        assert_eq!(mods.len(), 4);
        assert_eq!(mods[0].path, "github.com/fatih/color");
        assert_eq!(mods[0].version, "v1.7.0");
        assert_eq!(mods[2].path, "github.com/rsc/goversion");
        assert_eq!(mods[2].version, "v12.0.0");
        assert_eq!(mods[3].hash, "");
    }

    #[test]
    fn test_parse_replacement() {
        let raw = "dep\tgithub.com/markbates/inflect\tv1.0.0
=>\tgithub.com/markbates/inflect\tv0.0.0-20171215194931-a12c3aec81a6\th1:LZhVjIISSbj8qLf2qDPP0D8z0uvOWAW5C85ly5mJW6c=";
        let mods = parse_build_info(raw).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].version, "v0.0.0-20171215194931-a12c3aec81a6");
    }

    #[test]
    fn test_parse_go_version_m_output() {
        let raw = "./bin/tool: go1.22.1
\tpath\texample.com/tool
\tdep\tgithub.com/spf13/cobra\tv1.8.0\th1:abc=
\tdep\tgopkg.in/yaml.v3\tv3.0.1\th1:def=";
        let mods = parse_build_info(raw).unwrap();
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[1].path, "gopkg.in/yaml.v3");
    }

    #[test]
    fn test_parse_malformed_row() {
        let err = parse_build_info("dep\tonly-a-path").unwrap_err();
        assert!(err.to_string().contains("unexpected raw dependency format"));
    }

    #[test]
    fn test_read_modules_from_binary_and_text() {
        let binary = buildinfo::testing::inline_image("go1.22.1", &format!("{}\n", EXE_DATA));
        let from_binary = read_modules(&binary).unwrap();
        assert_eq!(from_binary, parse_build_info(EXE_DATA).unwrap());
        assert_eq!(from_binary[0].path, "github.com/fatih/color");

        let from_text = read_modules(EXE_DATA.as_bytes()).unwrap();
        assert_eq!(from_text.len(), 4);
    }

    #[test]
    fn test_read_modules_rejects_other_binaries() {
        let err = read_modules(&[0x7f, b'E', b'L', b'F', 0xfe, 0x00, 0xc3]).unwrap_err();
        assert!(matches!(err, GolicenseError::Binary(_)));
    }

    #[test]
    fn test_module_set_dedup_by_full_triple() {
        let mut set = ModuleSet::new();
        assert!(set.insert(Module::new("github.com/a/b", "v1.0.0", "h1:x")));
        assert!(!set.insert(Module::new("github.com/a/b", "v1.0.0", "h1:x")));
        assert!(set.insert(Module::new("github.com/a/b", "v1.0.0", "h1:y")));
        assert!(set.insert(Module::new("github.com/a/a", "v2.0.0", "")));

        let sorted = set.into_sorted();
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0].path, "github.com/a/a");
    }

    #[test]
    fn test_with_path_keeps_version() {
        let m = Module::new("gopkg.in/yaml.v3", "v3.0.1", "h1:z");
        let t = m.with_path("github.com/go-yaml/yaml");
        assert_eq!(t.version, "v3.0.1");
        assert_eq!(m.path, "gopkg.in/yaml.v3");
    }
}
