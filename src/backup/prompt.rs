//! Operator dialogue, kept generic over the input/output streams so it can be driven from tests.

use crate::backup::interrupt::Interrupt;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::normalize_separators;

use std::io::{BufRead, Write};
use std::path::PathBuf;

pub static SOURCE_QUESTION: &str =
    "Enter the source directory (where files and folders are located): ";
pub static BACKUP_ROOT_QUESTION: &str =
    "Enter the backup base directory (where backups should be saved): ";
static QUIT_QUESTION: &str = "Do you really want to quit? (y/n): ";

/// A Ctrl-C that lands while a line is being typed is seen once the line is submitted.
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    interrupt: Interrupt,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            interrupt: Interrupt::new(),
        }
    }

    /// Makes `ask` and `acknowledge` fail with `Error::Interrupted` once `interrupt` is set.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Prints a full status line.
    pub fn say<D: std::fmt::Display>(&mut self, line: D) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Prints `question` and reads one line, without its line ending.
    ///
    /// `None` when the input is closed.
    fn ask_raw(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn ask(&mut self, question: &str) -> Result<String> {
        let answer = self.ask_raw(question)?;
        self.interrupt.check()?;
        answer.ok_or_else(|| {
            Error::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
                .with_msg(format!("No answer to {:?}", question.trim()))
        })
    }

    /// Asks for a directory path, normalising `\` separators to `/`.
    pub fn ask_path(&mut self, question: &str) -> Result<PathBuf> {
        self.ask(question).map(normalize_separators)
    }

    /// Shows `message` and waits for Enter. A closed input counts as acknowledged.
    pub fn acknowledge(&mut self, message: &str) -> Result<()> {
        self.ask_raw(message)?;
        self.interrupt.check()
    }

    /// `true` only for an answer of exactly `y` or `Y`; a closed input also quits.
    ///
    /// Asked after an interruption, so the interrupt flag is not consulted.
    pub fn confirm_quit(&mut self) -> Result<bool> {
        Ok(self
            .ask_raw(QUIT_QUESTION)?
            .map(|answer| answer.to_lowercase() == "y")
            .unwrap_or(true))
    }
}
