//! # month-zip-backup
//!
//! Backs up a directory into a month-named zip archive.
//!
//! ## How a run works
//!
//! - **Staging**: the source's immediate entries are copied into
//!   `<backup_root>/<Month>[_<N>]`, file times included
//! - **Archiving**: the staged folder is zipped (Deflate) into
//!   `<backup_root>/<Month>[_<N>][_<M>].zip`, never overwriting an older backup
//! - **Cleanup**: the staged folder is removed once the archive is written
//!
//! Both phases report `(completed, total, phase)` to a
//! [`ProgressObserver`](backup::progress::ProgressObserver).
//!
//! ## Quick Start
//!
//! ```no_run
//! use month_zip_backup::backup::backup_config::BackupConfig;
//! use month_zip_backup::backup::interrupt::Interrupt;
//! use month_zip_backup::backup::progress::ConsoleProgress;
//!
//! let config = BackupConfig::builder()
//!     .source_dir("/home/me/Documents")
//!     .backup_root("/mnt/backups")
//!     .build();
//!
//! let today = chrono::Local::now().date_naive();
//! let outcome = config.run(today, &mut ConsoleProgress::stdout(), &Interrupt::new())?;
//! println!("Archive written to {:?}", outcome.targets().archive_path());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
