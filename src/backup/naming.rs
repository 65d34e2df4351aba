//! Month-scoped, collision-free names for the staged folder and the archive.

use chrono::NaiveDate;
use getset::Getters;

use std::path::{Path, PathBuf};

pub static ARCHIVE_FILE_EXT: &str = "zip";
static MONTH_FORMAT: &str = "%B";

/// Full English month name of `date`, e.g. `March`.
pub fn month_name(date: NaiveDate) -> String {
    date.format(MONTH_FORMAT).to_string()
}

/// Returns the first of `base`, `base_1`, `base_2`, ... that does not exist under `root`.
///
/// With an extension, candidates are probed as `<candidate>.<ext>` but the
/// returned name is the bare candidate.
pub fn first_unused_name<P: AsRef<Path>>(root: P, base: &str, ext: Option<&str>) -> String {
    let root = root.as_ref();
    let taken = |candidate: &str| match ext {
        Some(ext) => root.join(format!("{candidate}.{ext}")).exists(),
        None => root.join(candidate).exists(),
    };

    let mut candidate = base.to_string();
    let mut suffix = 1usize;
    while taken(&candidate) {
        tracing::debug!("{:?} already taken under {:?}", candidate, root);
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    candidate
}

/// Where a single run stages its copy and writes its archive.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct BackupTargets {
    staged_dir: PathBuf,
    archive_path: PathBuf,
}

impl BackupTargets {
    /// Probes `backup_root` for the month folder and then, independently, for the archive file.
    pub fn resolve<P: AsRef<Path>>(backup_root: P, date: NaiveDate) -> Self {
        let backup_root = backup_root.as_ref();
        let staged_name = first_unused_name(backup_root, &month_name(date), None);
        let archive_name = first_unused_name(backup_root, &staged_name, Some(ARCHIVE_FILE_EXT));

        Self {
            staged_dir: backup_root.join(&staged_name),
            archive_path: backup_root.join(format!("{archive_name}.{ARCHIVE_FILE_EXT}")),
        }
    }
}
