//! # Resolution engine
//!
//! Resolves every module of a run with bounded concurrency:
//!
//! - `cancel`: run-wide cancellation signal
//! - `status`: per-module status scope forwarding to the outputs
//!
//! Each module runs as its own task. A task first looks the module up as
//! is; when that yields no license it translates the path and runs the whole
//! finder chain again. The original module stays the reporting key.

pub mod cancel;
pub mod status;

pub use cancel::Cancellation;
pub use status::ModuleStatus;

use crate::finder::{Finder, FinderChain, Lookup};
use crate::license::StatusListener;
use crate::module::Module;
use crate::report::Output;
use crate::translate::{Translator, TranslatorChain};
use crate::{GolicenseError, GolicenseResult, MultiError};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Lookups in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 5;

// ─── Run Summary ───────────────────────────────────────────────────

/// Counts for one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub modules: usize,
    pub licensed: usize,
    pub unlicensed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Licensed,
    Unlicensed,
    Failed,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        self.modules += 1;
        match outcome {
            Outcome::Licensed => self.licensed += 1,
            Outcome::Unlicensed => self.unlicensed += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

// ─── Resolver ──────────────────────────────────────────────────────

/// Chains and signal shared read-only by every module task.
struct Shared {
    translators: TranslatorChain,
    finders: FinderChain,
    cancel: Cancellation,
}

pub struct Resolver {
    shared: Arc<Shared>,
    concurrency: usize,
}

#[derive(Default)]
pub struct ResolverBuilder {
    translators: TranslatorChain,
    finders: FinderChain,
    concurrency: Option<usize>,
    cancel: Option<Cancellation>,
}

impl ResolverBuilder {
    pub fn translators(mut self, chain: TranslatorChain) -> Self {
        self.translators = chain;
        self
    }

    pub fn translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translators.push(translator);
        self
    }

    /// Finders to consult. An empty chain lists modules without licenses.
    pub fn finders(mut self, chain: FinderChain) -> Self {
        self.finders = chain;
        self
    }

    pub fn finder(mut self, finder: impl Finder + 'static) -> Self {
        self.finders.push(finder);
        self
    }

    /// Maximum lookups in flight. Values below 1 are raised to 1.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            shared: Arc::new(Shared {
                translators: self.translators,
                finders: self.finders,
                cancel: self.cancel.unwrap_or_default(),
            }),
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        }
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.shared.cancel
    }

    /// Look up one module: as is first, then under its translated path.
    pub async fn resolve(&self, module: &Module, status: Option<&dyn StatusListener>) -> Lookup {
        self.shared.resolve(module, status).await
    }

    /// Resolve every module, reporting to `output`, then close it.
    ///
    /// Module failures are reported through `finish` and never fail the
    /// run; only the output's close error is returned.
    pub async fn run(
        &self,
        modules: impl IntoIterator<Item = Module>,
        output: Arc<dyn Output>,
    ) -> GolicenseResult<RunSummary> {
        let started = Instant::now();
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for module in modules {
            let shared = Arc::clone(&self.shared);
            let output = Arc::clone(&output);
            let slots = Arc::clone(&slots);
            tasks.spawn(async move {
                // Never closed, so acquiring only waits for a free slot
                let _permit = slots.acquire_owned().await.ok();
                shared.process(&module, output.as_ref()).await
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!("lookup task failed: {}", e);
                    summary.record(Outcome::Failed);
                }
            }
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "Resolved {} modules in {}ms ({} licensed, {} without license, {} failed)",
            summary.modules,
            summary.duration_ms,
            summary.licensed,
            summary.unlicensed,
            summary.failed
        );

        output.close()?;
        Ok(summary)
    }
}

impl Shared {
    /// One module task: start, lookup, finish. A panicking lookup still
    /// finishes the module, with an error.
    async fn process(&self, module: &Module, output: &dyn Output) -> Outcome {
        let status = ModuleStatus::new(module, output);
        output.start(module);
        tracing::debug!("→ {}", module);

        let (license, error) = if self.cancel.is_cancelled() {
            (None, Some(GolicenseError::Cancelled))
        } else {
            match AssertUnwindSafe(self.resolve(module, Some(&status)))
                .catch_unwind()
                .await
            {
                Ok(lookup) => lookup,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!("  ✗ {} panicked: {}", module, message);
                    let err = GolicenseError::Panicked {
                        module: module.to_string(),
                        message,
                    };
                    (None, Some(err))
                }
            }
        };

        let outcome = match (&license, &error) {
            (Some(_), _) => Outcome::Licensed,
            (None, Some(e)) => {
                tracing::debug!("  ✗ {}: {}", module, e);
                Outcome::Failed
            }
            (None, None) => Outcome::Unlicensed,
        };
        output.finish(module, license.as_ref(), error.as_ref());
        outcome
    }

    async fn resolve(&self, module: &Module, status: Option<&dyn StatusListener>) -> Lookup {
        let (license, first) = self.finders.find(module, status).await;
        if license.is_some() {
            return (license, None);
        }

        let cancelled = self.cancel.is_cancelled() || first.as_ref().is_some_and(GolicenseError::is_cancelled);
        if self.finders.is_empty() || cancelled {
            return (None, first);
        }

        let (translated, applied) = self.translators.translate(module, status).await;
        if !applied {
            return (None, first);
        }
        tracing::debug!("retrying {} as {}", module.path, translated.path);

        let (license, second) = self.finders.find(&translated, status).await;
        if license.is_some() {
            return (license, None);
        }

        let errors: MultiError = first.into_iter().chain(second).collect();
        (None, errors.into_result())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
