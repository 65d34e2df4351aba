//! Copies the immediate entries of the source directory into the staged folder.

use crate::backup::function_path;
use crate::backup::interrupt::Interrupt;
use crate::backup::progress::{Phase, ProgressObserver};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};

use filetime::FileTime;
use function_name::named;
use getset::Getters;
use itertools::Itertools;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use std::ffi::OsString;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// A top-level entry of the source directory.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct SourceItem {
    name: OsString,
    path: PathBuf,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Copied,
    Skipped { reason: String },
    Failed(Error),
}

#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct StagedItem {
    name: OsString,
    outcome: ItemOutcome,
}

/// Per-item result of the staging phase, in source listing order.
#[derive(Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct StageReport {
    items: Vec<StagedItem>,
}

impl StageReport {
    pub fn copied(&self) -> impl Iterator<Item = &StagedItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Copied))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StagedItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &StagedItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Failed(_)))
    }
}

/// Lists the source's immediate entries sorted by name; an empty source is fatal.
pub fn list_source_items<P: AsRef<Path>>(source_dir: P) -> Result<Vec<SourceItem>> {
    let source_dir = source_dir.as_ref();
    info!("Scanning source directory {:?} for files and folders...", source_dir);

    let items: Vec<SourceItem> = std::fs::read_dir(source_dir)
        .map_err(Error::from)
        .with_msg(format!("Listing {:?} failed", source_dir))?
        .map_ok(|de| SourceItem {
            name: de.file_name(),
            path: de.path(),
        })
        .collect::<std::io::Result<_>>()?;

    if items.is_empty() {
        return Err(Error::NothingToBackUp(source_dir.to_path_buf()));
    }

    let items = items
        .into_iter()
        .sorted_unstable_by(|a, b| a.name.cmp(&b.name))
        .collect_vec();
    info!("Found {} item(s) to back up.", items.len());
    Ok(items)
}

/// Copies every item into `staged_dir`, recording one outcome per item.
///
/// Copy failures stay inside the report; only an interruption aborts the phase.
pub fn copy_items<P: AsRef<Path>, O: ProgressObserver>(
    items: &[SourceItem],
    staged_dir: P,
    progress: &mut O,
    interrupt: &Interrupt,
) -> Result<StageReport> {
    let staged_dir = staged_dir.as_ref();
    let total = items.len();
    let mut report = StageReport::default();

    for (idx, item) in items.iter().enumerate() {
        interrupt.check()?;
        let outcome = stage_item(item, &staged_dir.join(&item.name), interrupt)?;
        match &outcome {
            ItemOutcome::Copied => debug!("Copied {:?}", item.path),
            ItemOutcome::Skipped { reason } => warn!("Skipping {:?}: {}", item.name, reason),
            ItemOutcome::Failed(e) => warn!("Error copying {:?}: {}", item.name, e),
        }
        report.items.push(StagedItem {
            name: item.name.clone(),
            outcome,
        });
        progress.on_progress(idx + 1, total, Phase::Staging);
    }
    progress.on_phase_complete(Phase::Staging);

    info!(
        "Staged {} of {} item(s) into {:?}",
        report.copied().count(),
        total,
        staged_dir
    );
    Ok(report)
}

fn stage_item(item: &SourceItem, dst: &Path, interrupt: &Interrupt) -> Result<ItemOutcome> {
    let metadata = match std::fs::metadata(&item.path) {
        Ok(md) => md,
        Err(e) => {
            return Ok(ItemOutcome::Skipped {
                reason: format!("unknown item type ({e})"),
            })
        }
    };

    let res = if metadata.is_file() {
        copy_file(&item.path, dst, &metadata)
    } else if metadata.is_dir() {
        copy_tree(&item.path, dst, interrupt)
    } else {
        return Ok(ItemOutcome::Skipped {
            reason: "unknown item type".to_string(),
        });
    };

    match res {
        Ok(()) => Ok(ItemOutcome::Copied),
        Err(e) if e.is_interrupted() => Err(e),
        Err(e) => Ok(ItemOutcome::Failed(e)),
    }
}

/// Copies contents, then carries over access and modification times.
fn copy_file(src: &Path, dst: &Path, metadata: &Metadata) -> Result<()> {
    std::fs::copy(src, dst)
        .map_err(Error::from)
        .with_msg(format!("Copy {:?} to {:?} failed", src, dst))?;
    copy_times(dst, metadata)
}

fn copy_times(dst: &Path, metadata: &Metadata) -> Result<()> {
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(metadata),
        FileTime::from_last_modification_time(metadata),
    )
    .map_err(Error::from)
    .with_msg(format!("Setting times on {:?} failed", dst))
}

/// Recursively copies `src` into `dst`, following symlinks.
///
/// Keeps going past individual failures and reports all of them at the end.
/// Directories are visited after their contents so their times stick.
#[named]
fn copy_tree(src: &Path, dst: &Path, interrupt: &Interrupt) -> Result<()> {
    let mut errors = Vec::new();

    for res in WalkDir::new(src).follow_links(true).contents_first(true) {
        interrupt.check()?;
        let res = res.map_err(Error::from).and_then(|de| {
            let target = dst.join(de.path().strip_prefix(src)?);
            let metadata = de.metadata()?;
            if de.file_type().is_dir() {
                trace!("Creating directory {:?}", target);
                std::fs::create_dir_all(&target)?;
                copy_times(&target, &metadata)
            } else if de.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                trace!("Copying {:?} -> {:?}", de.path(), target);
                copy_file(de.path(), &target, &metadata)
            } else {
                Err(Error::from(std::io::Error::other(format!(
                    "{:?} is neither a file nor a directory",
                    de.path()
                ))))
            }
        });
        if let Err(e) = res {
            errors.push(e);
        }
    }

    convert_error_vec(errors).with_debug_object_and_fn_name(src.to_path_buf(), function_path!())
}
