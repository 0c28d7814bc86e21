//! Result sinks: the terminal plus Markdown, JSON, CycloneDX SBOM, license
//! text, Excel and template report files.
//!
//! Every sink implements [`Output`]. The resolver calls `start` once per
//! module, any number of `update`s, exactly one `finish`, and `close` once
//! after every module finished. Calls arrive from many tasks at once, so
//! sinks keep their state behind a mutex and never block for long inside
//! `update`.
//!
//! File reports ([`FileOutput`]) collect results into a [`ResolutionLog`]
//! and render on close, sorted by module path.

pub mod json;
pub mod license_file;
pub mod markdown;
pub mod sbom;
pub mod template;
pub mod terminal;
pub mod xlsx;

pub use terminal::TerminalOutput;

use crate::license::{License, StatusKind};
use crate::module::Module;
use crate::policy::{AllowState, Config};
use crate::{GolicenseError, GolicenseResult, MultiError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A consumer of resolution progress and results.
pub trait Output: Send + Sync {
    /// A module's lookup has begun.
    fn start(&self, module: &Module);

    /// Progress message for a module between `start` and `finish`.
    fn update(&self, module: &Module, kind: StatusKind, message: &str);

    /// Final result for a module. `license` and `error` are never both set.
    fn finish(&self, module: &Module, license: Option<&License>, error: Option<&GolicenseError>);

    /// All modules are done; flush whatever was collected.
    fn close(&self) -> GolicenseResult<()>;
}

/// Broadcasts every call to each wrapped output, in order.
#[derive(Default, Clone)]
pub struct MultiOutput {
    outputs: Vec<Arc<dyn Output>>,
}

impl MultiOutput {
    pub fn new(outputs: Vec<Arc<dyn Output>>) -> Self {
        Self { outputs }
    }

    pub fn push(&mut self, output: Arc<dyn Output>) {
        self.outputs.push(output);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl Output for MultiOutput {
    fn start(&self, module: &Module) {
        for out in &self.outputs {
            out.start(module);
        }
    }

    fn update(&self, module: &Module, kind: StatusKind, message: &str) {
        for out in &self.outputs {
            out.update(module, kind, message);
        }
    }

    fn finish(&self, module: &Module, license: Option<&License>, error: Option<&GolicenseError>) {
        for out in &self.outputs {
            out.finish(module, license, error);
        }
    }

    /// Closes every output even when some fail; failures are combined.
    fn close(&self) -> GolicenseResult<()> {
        let mut errors = MultiError::new();
        for out in &self.outputs {
            if let Err(e) = out.close() {
                tracing::warn!("output close failed: {}", e);
                errors.push(e);
            }
        }
        match errors.into_result() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ─── Collected results ─────────────────────────────────────────────

/// Final outcome of one module, as kept by the file sinks.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub module: Module,
    pub license: Option<License>,
    pub error: Option<String>,
    pub state: AllowState,
}

/// Thread-safe accumulator of finished modules.
pub struct ResolutionLog {
    config: Arc<Config>,
    entries: Mutex<Vec<Resolution>>,
}

impl ResolutionLog {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn record(&self, module: &Module, license: Option<&License>, error: Option<&GolicenseError>) {
        let state = self.config.module_state(module, license, error);
        lock(&self.entries).push(Resolution {
            module: module.clone(),
            license: license.cloned(),
            error: error.map(|e| e.to_string()),
            state,
        });
    }

    /// Everything recorded so far, sorted by module path then version.
    pub fn sorted(&self) -> Vec<Resolution> {
        let mut entries = lock(&self.entries).clone();
        entries.sort_by(|a, b| a.module.cmp(&b.module));
        entries
    }
}

/// Lock a sink mutex. A panic in another sink call doesn't invalidate the
/// collected data, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── File reports ──────────────────────────────────────────────────

/// Format of a report written on close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable Markdown table
    Markdown,
    /// Structured JSON array (machine-readable)
    Json,
    /// CycloneDX 1.5 SBOM
    CycloneDxSbom,
    /// Concatenated license texts for redistribution notices
    LicenseText,
    /// Excel workbook, rows colored by allow state
    Xlsx,
    /// Handlebars template read from the given file
    Template(PathBuf),
}

/// Render collected results in the given format.
pub fn render_report(entries: &[Resolution], config: &Config, format: &ReportFormat) -> GolicenseResult<Vec<u8>> {
    let text = match format {
        ReportFormat::Markdown => markdown::render(entries, config),
        ReportFormat::Json => json::render(entries)?,
        ReportFormat::CycloneDxSbom => sbom::render_cyclonedx(entries, config)?,
        ReportFormat::LicenseText => license_file::render(entries),
        ReportFormat::Xlsx => return xlsx::render(entries, config),
        ReportFormat::Template(path) => template::render(entries, path)?,
    };
    Ok(text.into_bytes())
}

/// Sink that collects results and writes one report file on close.
pub struct FileOutput {
    path: PathBuf,
    format: ReportFormat,
    log: ResolutionLog,
}

impl FileOutput {
    pub fn new(path: impl Into<PathBuf>, format: ReportFormat, config: Arc<Config>) -> Self {
        Self {
            path: path.into(),
            format,
            log: ResolutionLog::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &ReportFormat {
        &self.format
    }

    /// The report as it would be written right now.
    pub fn render(&self) -> GolicenseResult<Vec<u8>> {
        render_report(&self.log.sorted(), self.log.config(), &self.format)
    }
}

impl Output for FileOutput {
    fn start(&self, _module: &Module) {}

    fn update(&self, _module: &Module, _kind: StatusKind, _message: &str) {}

    fn finish(&self, module: &Module, license: Option<&License>, error: Option<&GolicenseError>) {
        self.log.record(module, license, error);
    }

    fn close(&self) -> GolicenseResult<()> {
        let content = self.render()?;
        std::fs::write(&self.path, content)
            .map_err(|e| GolicenseError::Output(format!("writing {}: {}", self.path.display(), e)))?;
        tracing::info!("Wrote {:?} report to {}", self.format, self.path.display());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Event, RecordingOutput};
    use super::*;

    #[test]
    fn test_multi_output_broadcasts() {
        let a = Arc::new(RecordingOutput::default());
        let b = Arc::new(RecordingOutput::default());
        let multi = MultiOutput::new(vec![a.clone(), b.clone()]);

        let m = Module::new("github.com/foo/bar", "v1.0.0", "");
        multi.start(&m);
        multi.update(&m, StatusKind::Normal, "querying license");
        multi.finish(&m, Some(&License::new("MIT License", "MIT")), None);
        multi.close().unwrap();

        for out in [&a, &b] {
            assert_eq!(
                out.events(),
                vec![
                    Event::Start("github.com/foo/bar".into()),
                    Event::Update("github.com/foo/bar".into(), StatusKind::Normal, "querying license".into()),
                    Event::Finish("github.com/foo/bar".into(), Some("MIT".into()), None),
                    Event::Close,
                ]
            );
        }
    }

    #[test]
    fn test_multi_output_closes_all_and_combines_errors() {
        let a = Arc::new(RecordingOutput::failing());
        let b = Arc::new(RecordingOutput::default());
        let c = Arc::new(RecordingOutput::failing());
        let multi = MultiOutput::new(vec![a.clone(), b.clone(), c.clone()]);

        let err = multi.close().unwrap_err();
        match err {
            GolicenseError::Multi(m) => assert_eq!(m.len(), 2),
            other => panic!("expected combined error, got {other}"),
        }
        assert_eq!(b.events(), vec![Event::Close]);
        assert_eq!(c.events(), vec![Event::Close]);
    }

    #[test]
    fn test_multi_output_single_close_error_is_unwrapped() {
        let multi = MultiOutput::new(vec![
            Arc::new(RecordingOutput::default()),
            Arc::new(RecordingOutput::failing()),
        ]);
        assert!(matches!(multi.close(), Err(GolicenseError::Output(_))));
    }

    #[test]
    fn test_resolution_log_sorts_and_evaluates() {
        let config = Arc::new(Config {
            allow: vec!["MIT".into()],
            ..Default::default()
        });
        let log = ResolutionLog::new(config);
        log.record(
            &Module::new("github.com/zz/last", "v1.0.0", ""),
            None,
            Some(&GolicenseError::Config("boom".into())),
        );
        log.record(
            &Module::new("github.com/aa/first", "v1.0.0", ""),
            Some(&License::new("MIT License", "MIT")),
            None,
        );

        let entries = log.sorted();
        assert_eq!(entries[0].module.path, "github.com/aa/first");
        assert_eq!(entries[0].state, AllowState::Allowed);
        assert_eq!(entries[1].state, AllowState::Unknown);
        assert_eq!(entries[1].error.as_deref(), Some("configuration error: boom"));
    }

    #[test]
    fn test_file_output_writes_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("licenses.md");
        let out = FileOutput::new(&path, ReportFormat::Markdown, Arc::new(Config::default()));

        let m = Module::new("github.com/foo/bar", "v1.0.0", "");
        out.start(&m);
        out.finish(&m, Some(&License::new("MIT License", "MIT")), None);
        assert!(!path.exists());

        out.close().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("github.com/foo/bar"));
    }

    #[test]
    fn test_file_output_writes_template_and_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("notice.hbs");
        std::fs::write(&template, "{{#each entries}}{{dependency}} {{spdx}}\n{{/each}}").unwrap();

        let config = Arc::new(Config::default());
        let text_path = dir.path().join("NOTICE");
        let xlsx_path = dir.path().join("licenses.xlsx");
        let text = FileOutput::new(&text_path, ReportFormat::Template(template), Arc::clone(&config));
        let sheet = FileOutput::new(&xlsx_path, ReportFormat::Xlsx, config);

        for out in [&text, &sheet] {
            out.finish(
                &Module::new("github.com/zz/last", "v1.0.0", ""),
                Some(&License::new("MIT License", "MIT")),
                None,
            );
            out.finish(&Module::new("github.com/aa/first", "v1.0.0", ""), None, None);
            out.close().unwrap();
        }

        assert_eq!(
            std::fs::read_to_string(&text_path).unwrap(),
            "github.com/aa/first \ngithub.com/zz/last MIT\n"
        );
        assert!(std::fs::read(&xlsx_path).unwrap().starts_with(b"PK"));
    }

    #[test]
    fn test_file_output_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let out = FileOutput::new(&path, ReportFormat::Json, Arc::new(Config::default()));
        assert!(matches!(out.close(), Err(GolicenseError::Output(_))));
    }
}
