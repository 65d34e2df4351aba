//! Progress feedback shared by the staging and archiving phases.
//!
//! Phases only talk to a [`ProgressObserver`]; the console bar is one
//! consumer, a `Vec<ProgressEvent>` is another.

use derive_more::Display;

use std::io::Write;

pub static BAR_WIDTH: usize = 50;
static FILLED_GLYPH: &str = "#";
static EMPTY_GLYPH: &str = ".";

/// One of the two progress-tracked operations of a run.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Phase {
    #[display("Backing up")]
    Staging,
    #[display("Zipping")]
    Archiving,
}

pub trait ProgressObserver {
    fn on_progress(&mut self, completed: usize, total: usize, phase: Phase);

    fn on_phase_complete(&mut self, _phase: Phase) {}
}

/// Renders `[###...] current/total label` with a fixed 50 segment bar.
///
/// `total == 0` counts as complete.
pub fn render_bar<D: std::fmt::Display>(current: usize, total: usize, label: D) -> String {
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (current.saturating_mul(BAR_WIDTH) / total).min(BAR_WIDTH)
    };
    format!(
        "[{}{}] {}/{} {}",
        FILLED_GLYPH.repeat(filled),
        EMPTY_GLYPH.repeat(BAR_WIDTH - filled),
        current,
        total,
        label
    )
}

/// Redraws the bar in place on every event, ends the line when the phase completes.
pub struct ConsoleProgress<W: Write> {
    out: W,
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleProgress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ProgressObserver for ConsoleProgress<W> {
    fn on_progress(&mut self, completed: usize, total: usize, phase: Phase) {
        let res = write!(self.out, "\r{}", render_bar(completed, total, phase))
            .and_then(|_| self.out.flush());
        if let Err(e) = res {
            tracing::debug!("Failed to draw progress bar: {e}");
        }
    }

    fn on_phase_complete(&mut self, phase: Phase) {
        if let Err(e) = writeln!(self.out) {
            tracing::debug!("Failed to end {phase} progress line: {e}");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub phase: Phase,
}

impl ProgressObserver for Vec<ProgressEvent> {
    fn on_progress(&mut self, completed: usize, total: usize, phase: Phase) {
        self.push(ProgressEvent {
            completed,
            total,
            phase,
        });
    }
}
