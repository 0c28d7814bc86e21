//! License lookup strategies
//!
//! A [`Finder`] resolves the license of one module. It answers with
//! `Ok(Some(license))`, `Ok(None)` when the module is outside its reach,
//! or an error when the lookup itself failed. [`find`] runs finders in
//! order: failures are collected and the next finder is tried, and the
//! first license found ends the search.

pub mod github;
pub mod mapper;
pub mod retry;

pub use github::GithubFinder;
pub use mapper::OverrideFinder;
pub use retry::RateLimitRetry;

use crate::license::{License, StatusListener};
use crate::module::Module;
use crate::{GolicenseError, MultiError};
use async_trait::async_trait;

/// Result of a finder chain: a license, a failure, both absent, or never
/// both present.
pub type Lookup = (Option<License>, Option<GolicenseError>);

/// A license lookup strategy.
#[async_trait]
pub trait Finder: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Look up the license for `module`. Never modifies the module.
    async fn license(
        &self,
        module: &Module,
        status: Option<&dyn StatusListener>,
    ) -> crate::GolicenseResult<Option<License>>;
}

/// Try `finders` in order.
///
/// - An error is recorded and the next finder runs.
/// - The first license returned wins; earlier errors are dropped.
/// - With no license, returns every recorded error combined (`None` if every
///   finder simply declined).
pub async fn find(module: &Module, finders: &[Box<dyn Finder>], status: Option<&dyn StatusListener>) -> Lookup {
    let mut errors = MultiError::new();

    for finder in finders {
        match finder.license(module, status).await {
            Ok(Some(license)) => {
                tracing::debug!("{}: {} → {}", finder.name(), module.path, license);
                return (Some(license), None);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("{}: {} failed: {}", finder.name(), module.path, e);
                let cancelled = e.is_cancelled();
                errors.push(e);
                if cancelled {
                    break;
                }
            }
        }
    }

    (None, errors.into_result())
}

/// Ordered set of finders shared by every module task.
#[derive(Default)]
pub struct FinderChain {
    finders: Vec<Box<dyn Finder>>,
}

impl FinderChain {
    pub fn new(finders: Vec<Box<dyn Finder>>) -> Self {
        Self { finders }
    }

    pub fn push(&mut self, finder: impl Finder + 'static) {
        self.finders.push(Box::new(finder));
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    pub async fn find(&self, module: &Module, status: Option<&dyn StatusListener>) -> Lookup {
        find(module, &self.finders, status).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Finder returning a fixed answer and counting calls.
    pub struct StaticFinder {
        pub answer: fn() -> crate::GolicenseResult<Option<License>>,
        pub calls: AtomicUsize,
    }

    impl StaticFinder {
        pub fn new(answer: fn() -> crate::GolicenseResult<Option<License>>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Finder for StaticFinder {
        fn name(&self) -> &str {
            "static"
        }

        async fn license(
            &self,
            _module: &Module,
            _status: Option<&dyn StatusListener>,
        ) -> crate::GolicenseResult<Option<License>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)()
        }
    }
}
