use crate::backup::archive::ArchiveEntry;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};

use function_name::named;
use walkdir::{DirEntry, WalkDir};

use std::path::Path;

/// Walks `staged_dir` and returns one entry per file, at any depth.
///
/// Entries come back sorted by file name so archives are reproducible;
/// directories only show up through the paths of the files they hold.
#[named]
pub fn collect_entries<P: AsRef<Path>>(staged_dir: P) -> Result<Vec<ArchiveEntry>> {
    let staged_dir = staged_dir.as_ref();
    if !staged_dir.is_dir() {
        tracing::error!(
            "Staged directory does not exist or is not a directory: {:?}",
            staged_dir
        );
        return Err(Error::from(std::io::Error::other(
            "staged_dir is not a directory",
        )));
    }

    tracing::debug!("Scanning staged directory {:?}", staged_dir);
    WalkDir::new(staged_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|res| match res {
            Ok(de) => process_dir_entry(de, staged_dir),
            Err(e) => Some(Err(e.into())),
        })
        .collect::<Result<Vec<_>>>()
        .with_debug_object_and_fn_name(staged_dir.to_path_buf(), function_path!())
}

fn process_dir_entry(de: DirEntry, base_dir: &Path) -> Option<Result<ArchiveEntry>> {
    if !de.file_type().is_file() {
        tracing::trace!("Skipping {:?} not a file", de.path());
        return None;
    }

    let p = de.into_path();
    let res = match p.strip_prefix(base_dir) {
        Ok(stripped_path) => Ok(ArchiveEntry::new(p.as_path(), stripped_path)),
        Err(e) => Err(Error::from(e)
            .with_msg(format!("Stripping {:?} from {:?} failed", base_dir, p))),
    };

    if let Ok(entry) = &res {
        tracing::trace!("Including file: {:?} -> {:?}", entry.src, entry.dst);
    }
    Some(res)
}
