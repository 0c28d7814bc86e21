//! # golicense: license resolution for Go binary dependencies
//!
//! Given the set of modules embedded in a compiled Go program, determines the
//! most likely license of each one and streams progress and results to any
//! number of report renderers.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Resolver                             │
//! │   ModuleSet ──► JoinSet (≤ K permits) ──► one task per module │
//! │                                                               │
//! │   task:  find(original) ──no license/err──► find(translated)  │
//! │            │                                   ▲              │
//! │            ▼                                   │              │
//! │   ┌──────────────────┐            ┌────────────┴──────────┐   │
//! │   │ FinderChain      │            │ TranslatorChain       │   │
//! │   │ override → GitHub│            │ map → vcs → go → gopkg│   │
//! │   └────────┬─────────┘            └───────────────────────┘   │
//! │            │ status events (non-blocking)                     │
//! │            ▼                                                  │
//! │   MultiOutput ──► terminal │ markdown │ json │ sbom │ text    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Translators** rewrite vanity or redirected import paths into a form a
//!   finder understands. The original module stays the reporting key.
//! - **Finders** are tried in order; errors are aggregated, the first license
//!   wins.
//! - **GitHub finder** waits out rate-limit windows, stopping early only when
//!   the run is cancelled.
//! - **Outputs** receive `start` / `update` / `finish` per module and a final
//!   `close`.

pub mod engine;
pub mod finder;
pub mod license;
pub mod module;
pub mod policy;
pub mod report;
pub mod translate;

pub use engine::{Cancellation, Resolver, ResolverBuilder, RunSummary};
pub use finder::{find, Finder, FinderChain};
pub use license::{License, StatusKind, StatusListener};
pub use module::{Module, ModuleSet};
pub use policy::{AllowState, Config};
pub use report::{FileOutput, MultiOutput, Output, ReportFormat, TerminalOutput};
pub use translate::{Translator, TranslatorChain};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GolicenseError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("rate limited, retry in {wait:?}")]
    RateLimited { wait: Duration },

    #[error("operation cancelled")]
    Cancelled,

    #[error("lookup for {module} panicked: {message}")]
    Panicked { module: String, message: String },

    #[error("override license {id:?} SPDX lookup error: unknown license identifier")]
    UnknownSpdx { id: String },

    #[error("invalid translation pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unexpected raw dependency format: {0}")]
    BuildInfo(String),

    #[error("reading Go binary: {0}")]
    Binary(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Multi(#[from] MultiError),
}

impl GolicenseError {
    /// Whether this error means the run was cancelled, directly or inside a
    /// combined error.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Multi(multi) => multi.errors().iter().any(|e| e.is_cancelled()),
            _ => false,
        }
    }
}

pub type GolicenseResult<T> = Result<T, GolicenseError>;

/// Several errors collected from independent attempts, kept in the order
/// they occurred.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<GolicenseError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error. Nested multi-errors are flattened.
    pub fn push(&mut self, err: GolicenseError) {
        match err {
            GolicenseError::Multi(inner) => self.errors.extend(inner.errors),
            other => self.errors.push(other),
        }
    }

    pub fn errors(&self) -> &[GolicenseError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `None` when nothing was collected, the lone error when exactly one
    /// was, otherwise the combined error.
    pub fn into_result(mut self) -> Option<GolicenseError> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => Some(GolicenseError::Multi(self)),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            return write!(f, "1 error occurred:\n\t* {}", self.errors[0]);
        }
        write!(f, "{} errors occurred:", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n\t* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl FromIterator<GolicenseError> for MultiError {
    fn from_iter<I: IntoIterator<Item = GolicenseError>>(iter: I) -> Self {
        let mut multi = MultiError::new();
        for err in iter {
            multi.push(err);
        }
        multi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_error_flattens_nested() {
        let mut inner = MultiError::new();
        inner.push(GolicenseError::Cancelled);
        inner.push(GolicenseError::Config("a".into()));

        let mut outer = MultiError::new();
        outer.push(GolicenseError::Output("b".into()));
        outer.push(GolicenseError::Multi(inner));

        assert_eq!(outer.len(), 3);
        assert!(matches!(outer.errors()[0], GolicenseError::Output(_)));
    }

    #[test]
    fn test_multi_error_into_result() {
        assert!(MultiError::new().into_result().is_none());

        let single: MultiError = vec![GolicenseError::Cancelled].into_iter().collect();
        assert!(matches!(single.into_result(), Some(GolicenseError::Cancelled)));

        let many: MultiError = vec![
            GolicenseError::Cancelled,
            GolicenseError::Config("bad".into()),
        ]
        .into_iter()
        .collect();
        let err = many.into_result().unwrap();
        assert!(err.is_cancelled());
        assert!(err.to_string().starts_with("2 errors occurred:"));
    }
}
