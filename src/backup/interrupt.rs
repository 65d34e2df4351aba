use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator interruption flag, set from the Ctrl-C handler and polled between files.
///
/// A set flag always aborts the running phase; nothing is resumed afterwards.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes Ctrl-C (and SIGTERM) into a new flag. Can only be done once per process.
    pub fn install_ctrlc_handler() -> Result<Self> {
        let interrupt = Self::new();
        let handler_flag = interrupt.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got Ctrl-C, stopping after the current file");
            handler_flag.trigger();
        })?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}
