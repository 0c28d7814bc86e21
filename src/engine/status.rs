//! Per-module status scope
//!
//! Routes status events emitted during one module's lookup to the output
//! layer, tagged with that module.

use crate::license::{StatusKind, StatusListener};
use crate::module::Module;
use crate::report::Output;

pub struct ModuleStatus<'a> {
    module: &'a Module,
    output: &'a dyn Output,
}

impl<'a> ModuleStatus<'a> {
    pub fn new(module: &'a Module, output: &'a dyn Output) -> Self {
        Self { module, output }
    }
}

impl StatusListener for ModuleStatus<'_> {
    fn update(&self, kind: StatusKind, message: &str) {
        self.output.update(self.module, kind, message);
    }
}
