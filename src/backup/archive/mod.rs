pub mod walkdir_source;
pub mod zip_writer;

use itertools::Itertools;
use std::path::{Component, Path};
use std::sync::Arc;

/// A single file of the staged folder on its way into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Source file path on the filesystem
    pub src: Arc<Path>,

    /// Path inside the archive, relative to the staged folder root
    pub dst: Arc<Path>,
}

impl ArchiveEntry {
    pub fn new<A: Into<Arc<Path>>, B: Into<Arc<Path>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Name stored in the archive: `dst` joined with `/` whatever the platform separator.
    pub fn archive_name(&self) -> String {
        self.dst
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .join("/")
    }
}
