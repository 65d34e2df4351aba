use crate::backup::archive::walkdir_source::collect_entries;
use crate::backup::archive::ArchiveEntry;
use crate::backup::interrupt::Interrupt;
use crate::backup::progress::{Phase, ProgressObserver};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;

use chrono::{DateTime, Datelike, Local, Timelike};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use std::fs::File;
use std::io::{BufWriter, IntoInnerError, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

/// Files at or above this size need zip64 records.
static LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// Zips every file under `staged_dir` into a new archive at `archive_path`.
///
/// The file count is taken up front so progress can be reported as
/// `completed/total`. Returns the number of files written.
pub fn create_zip_archive<P1: AsRef<Path>, P2: AsRef<Path>, O: ProgressObserver>(
    staged_dir: P1,
    archive_path: P2,
    progress: &mut O,
    interrupt: &Interrupt,
) -> Result<usize> {
    let archive_path = archive_path.as_ref();
    let entries = collect_entries(staged_dir)?;
    let total = entries.len();
    tracing::info!("Zipping {} file(s) into {:?}", total, archive_path);

    let file = File::create_new(archive_path)
        .map_err(Error::from)
        .with_msg(format!("Create archive {:?} failed", archive_path))?;

    // The file belongs to this run from here on; any failure removes it.
    write_entries(file, &entries, progress, interrupt).map_err(|mut e| {
        if let Err(e2) = std::fs::remove_file(archive_path) {
            e = e.chain(Error::from(e2).with_msg(format!(
                "Removing partial archive {:?} failed",
                archive_path
            )));
        }
        e
    })?;

    tracing::info!("Zip creation complete: {:?}", archive_path);
    Ok(total)
}

fn write_entries<O: ProgressObserver>(
    file: File,
    entries: &[ArchiveEntry],
    progress: &mut O,
    interrupt: &Interrupt,
) -> Result<()> {
    let total = entries.len();
    let mut writer = ZipWriter::new(BufWriter::new(file));

    if total == 0 {
        tracing::warn!("Nothing was staged, writing an empty archive");
        progress.on_progress(0, 0, Phase::Archiving);
    }

    for (idx, entry) in entries.iter().enumerate() {
        interrupt.check()?;
        append_entry(&mut writer, entry)
            .with_msg(format!("Adding {:?} to archive failed", entry.src))?;
        progress.on_progress(idx + 1, total, Phase::Archiving);
    }

    writer
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .sync_all()?;
    progress.on_phase_complete(Phase::Archiving);
    Ok(())
}

fn append_entry<W: Write + Seek>(writer: &mut ZipWriter<W>, entry: &ArchiveEntry) -> Result<()> {
    let mut src = File::open(&entry.src)?;
    let metadata = src.metadata()?;

    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= LARGE_FILE_THRESHOLD);
    if let Some(dt) = metadata.modified().ok().and_then(zip_date_time) {
        options = options.last_modified_time(dt);
    }

    let name = entry.archive_name();
    tracing::trace!("Writing {:?} as {:?}", entry.src, name);
    writer.start_file(name, options)?;
    std::io::copy(&mut src, writer)?;
    Ok(())
}

/// Local wall-clock time in zip's MS-DOS format, `None` outside 1980..=2107.
fn zip_date_time(time: SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = time.into();
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
