//! Terminal output
//!
//! Two modes:
//! - **live**: one in-progress line per running module, redrawn in place,
//!   with finished modules printed above the live region. Used when stdout
//!   is a TTY.
//! - **plain**: one line per finished module. With `verbose`, every status
//!   message is printed as well.
//!
//! Also tracks the process exit code: 1 when any module is denied, or is
//! unknown (no license, or a failed lookup) while allow/deny rules are
//! configured.

use super::{lock, Output};
use crate::license::{describe, License, StatusKind};
use crate::module::Module;
use crate::policy::{AllowState, Config};
use crate::{GolicenseError, GolicenseResult};
use crossterm::style::{style, Color, Stylize};
use crossterm::{cursor, terminal, QueueableCommand};
use is_terminal::IsTerminal;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

const ICON_WARNING: &str = "⚠️ ";
const ICON_ERROR: &str = "🚫";
const ICON_SUCCESS: &str = "✅";

pub struct TerminalOutput {
    config: Arc<Config>,
    plain: bool,
    verbose: bool,
    /// Column width modules are padded to
    width: usize,
    exit_code: AtomicI32,
    state: Mutex<TermState>,
}

struct TermState {
    out: Box<dyn Write + Send>,
    live: LiveRegion,
    /// In-progress line per module path
    active: BTreeMap<String, String>,
}

impl TerminalOutput {
    /// Output to stdout. Falls back to plain mode when stdout isn't a TTY.
    pub fn stdout(config: Arc<Config>, modules: &[Module], plain: bool, verbose: bool) -> Self {
        let plain = plain || !io::stdout().is_terminal();
        Self::with_writer(io::stdout(), config, modules, plain, verbose)
    }

    /// Output to any writer. `modules` is only used to align columns.
    pub fn with_writer<W: Write + Send + 'static>(
        writer: W,
        config: Arc<Config>,
        modules: &[Module],
        plain: bool,
        verbose: bool,
    ) -> Self {
        let width = modules.iter().map(|m| m.path.len()).max().unwrap_or(0);
        Self {
            config,
            plain,
            verbose,
            width,
            exit_code: AtomicI32::new(0),
            state: Mutex::new(TermState {
                out: Box::new(writer),
                live: LiveRegion::default(),
                active: BTreeMap::new(),
            }),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    fn padded(&self, module: &Module) -> String {
        format!("{:<width$}", module.path, width = self.width)
    }

    /// Icon and colour for a finished module; flags the exit code.
    fn verdict(&self, state: AllowState) -> Option<(&'static str, Color)> {
        match state {
            AllowState::Allowed => Some((ICON_SUCCESS, Color::Green)),
            AllowState::Denied => {
                self.exit_code.store(1, Ordering::SeqCst);
                Some((ICON_ERROR, Color::Red))
            }
            AllowState::Unknown if self.config.has_rules() => {
                self.exit_code.store(1, Ordering::SeqCst);
                Some((ICON_WARNING, Color::Yellow))
            }
            AllowState::Unknown => None,
        }
    }

    fn redraw(&self, state: &mut TermState) {
        let content = state.active.values().cloned().collect::<Vec<_>>().join("\n");
        let TermState { out, live, .. } = state;
        if let Err(e) = live.update(out, &content) {
            tracing::debug!("terminal redraw failed: {}", e);
        }
    }
}

impl Output for TerminalOutput {
    fn start(&self, module: &Module) {
        if self.plain {
            return;
        }
        let mut state = lock(&self.state);
        state
            .active
            .insert(module.path.clone(), format!("{} starting...", self.padded(module)));
        self.redraw(&mut state);
    }

    fn update(&self, module: &Module, kind: StatusKind, message: &str) {
        if self.plain {
            if self.verbose {
                let mut state = lock(&self.state);
                if let Err(e) = writeln!(state.out, "{} {}", self.padded(module), message) {
                    tracing::debug!("terminal write failed: {}", e);
                }
            }
            return;
        }

        let line = format!("{} {}", self.padded(module), message);
        let line = match kind {
            StatusKind::Normal => line,
            StatusKind::Warning => style(format!("{} {}", ICON_WARNING, line)).yellow().to_string(),
            StatusKind::Error => style(format!("{} {}", ICON_ERROR, line)).red().to_string(),
        };

        let mut state = lock(&self.state);
        state.active.insert(module.path.clone(), line);
        self.redraw(&mut state);
    }

    fn finish(&self, module: &Module, license: Option<&License>, error: Option<&GolicenseError>) {
        let result = match error {
            Some(err) => format!("ERROR: {}", err),
            None => describe(license),
        };
        let verdict = self.verdict(self.config.module_state(module, license, error));

        let mut state = lock(&self.state);
        if self.plain {
            if let Err(e) = writeln!(state.out, "{} {}", self.padded(module), result) {
                tracing::debug!("terminal write failed: {}", e);
            }
            return;
        }

        state.active.remove(&module.path);
        let line = match verdict {
            Some((icon, color)) => style(format!("{} {} {}", icon, self.padded(module), result))
                .with(color)
                .to_string(),
            None => format!("{} {}", self.padded(module), result),
        };

        let TermState { out, live, .. } = &mut *state;
        if let Err(e) = live.print_above(out, &line) {
            tracing::debug!("terminal write failed: {}", e);
        }
        self.redraw(&mut state);
    }

    fn close(&self) -> GolicenseResult<()> {
        let mut state = lock(&self.state);
        state.active.clear();
        let TermState { out, live, .. } = &mut *state;
        if !self.plain {
            live.clear(out)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Block of lines at the bottom of the terminal that is rewritten in place.
#[derive(Debug, Default)]
struct LiveRegion {
    lines: usize,
}

impl LiveRegion {
    fn clear(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.update(out, "")
    }

    /// Print a permanent line where the region was; the caller redraws.
    fn print_above(&mut self, out: &mut impl Write, line: &str) -> io::Result<()> {
        self.clear(out)?;
        writeln!(out, "{}", line)
    }

    fn update(&mut self, out: &mut impl Write, content: &str) -> io::Result<()> {
        let mut content = content.to_string();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }

        let previous = self.lines.min(u16::MAX as usize) as u16;
        if previous > 0 {
            out.queue(cursor::MoveUp(previous))?;
            out.queue(cursor::MoveToColumn(0))?;
            out.queue(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        }

        out.write_all(content.as_bytes())?;
        out.flush()?;

        self.lines = content.matches('\n').count();
        Ok(())
    }
}
