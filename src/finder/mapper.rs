//! Exact-path license overrides
//!
//! Maps an import path straight to an SPDX identifier. Placed first in the
//! chain so configured answers win over live lookups.

use super::Finder;
use crate::license::{spdx, License, StatusListener};
use crate::module::Module;
use crate::{GolicenseError, GolicenseResult};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OverrideFinder {
    map: HashMap<String, String>,
}

impl OverrideFinder {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }
}

#[async_trait]
impl Finder for OverrideFinder {
    fn name(&self) -> &str {
        "override"
    }

    async fn license(&self, module: &Module, _status: Option<&dyn StatusListener>) -> GolicenseResult<Option<License>> {
        let Some(id) = self.map.get(&module.path) else {
            return Ok(None);
        };

        spdx::lookup(id)
            .map(Some)
            .ok_or_else(|| GolicenseError::UnknownSpdx { id: id.clone() })
    }
}
