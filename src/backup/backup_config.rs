use crate::backup::archive::zip_writer::create_zip_archive;
use crate::backup::interrupt::Interrupt;
use crate::backup::naming::BackupTargets;
use crate::backup::progress::ProgressObserver;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::stage::{copy_items, list_source_items, StageReport};
use crate::backup::validate::validate_dir_exist;

use bon::Builder;
use chrono::NaiveDate;
use getset::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use std::fs::File;
use std::path::{Path, PathBuf};

/// The two directories a backup run works with.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupConfig {
    /// Directory whose immediate contents are backed up, read only
    #[validate(custom(function = validate_dir_exist))]
    #[builder(into)]
    source_dir: PathBuf,
    /// Directory receiving the month folder and the archive
    #[validate(custom(function = validate_dir_exist))]
    #[builder(into)]
    backup_root: PathBuf,
}

/// What a successful run leaves behind.
#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct BackupOutcome {
    targets: BackupTargets,
    stage_report: StageReport,
    archived_files: usize,
    /// Set when the staged folder could not be removed; the archive is still valid.
    cleanup_error: Option<Error>,
}

impl BackupConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(|f| {
                serde_yml::from_reader::<_, BackupConfig>(f)
                    .map_err(Error::from)
                    .with_msg(format!("Parse YAML config failed: {:?}", path))
            })
    }

    /// Validates, stages, archives and cleans up, in that order.
    ///
    /// `date` picks the month folder. An empty source fails before anything
    /// is created under the backup root; a failure or interruption after the
    /// staged folder exists removes it and any partial archive this run wrote.
    pub fn run<O: ProgressObserver>(
        &self,
        date: NaiveDate,
        progress: &mut O,
        interrupt: &Interrupt,
    ) -> Result<BackupOutcome> {
        self.validate()
            .map_err(Error::from)
            .with_msg("Config validation failed")?;

        let items = list_source_items(&self.source_dir)?;
        let targets = BackupTargets::resolve(&self.backup_root, date);
        info!("Backup will be saved in: {:?}", targets.staged_dir());
        info!("Zip file will be saved as: {:?}", targets.archive_path());

        std::fs::create_dir(targets.staged_dir())
            .map_err(Error::from)
            .with_msg(format!(
                "Create backup directory {:?} failed",
                targets.staged_dir()
            ))?;
        info!("Backup directory created: {:?}", targets.staged_dir());

        let stage_report = copy_items(&items, targets.staged_dir(), progress, interrupt)
            .map_err(|e| discard_partial_backup(&targets, e))?;

        let archived_files = create_zip_archive(
            targets.staged_dir(),
            targets.archive_path(),
            progress,
            interrupt,
        )
        .map_err(|e| discard_partial_backup(&targets, e))?;

        info!("Removing temporary backup directory...");
        let cleanup_error = std::fs::remove_dir_all(targets.staged_dir())
            .map_err(Error::from)
            .with_msg(format!(
                "Removing temporary backup directory {:?} failed",
                targets.staged_dir()
            ))
            .err();
        match &cleanup_error {
            None => info!("Temporary directory removed successfully."),
            Some(e) => warn!("{e}"),
        }

        Ok(BackupOutcome {
            targets,
            stage_report,
            archived_files,
            cleanup_error,
        })
    }
}

/// Best-effort removal of the staged folder; cleanup failures ride along with `e`.
///
/// A partial archive is removed by `create_zip_archive` itself, so a file that
/// only shares the archive name is never touched here.
fn discard_partial_backup(targets: &BackupTargets, mut e: Error) -> Error {
    if targets.staged_dir().exists() {
        if let Err(e2) = std::fs::remove_dir_all(targets.staged_dir()) {
            e = e.chain(Error::from(e2).with_msg(format!(
                "Removing {:?} failed",
                targets.staged_dir()
            )));
        }
    }
    e.with_debug_object_and_fn_name(targets.clone(), "run")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::progress::{Phase, ProgressEvent};
    use itertools::Itertools;
    use std::io::Read;
    use tempfile::TempDir;
    use walkdir::WalkDir;
    use zip::ZipArchive;

    fn march() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn no_progress() -> Vec<ProgressEvent> {
        Vec::new()
    }

    fn create_source(dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir.join("photos/2024"))?;
        std::fs::create_dir_all(dir.join("notes"))?;
        std::fs::write(dir.join("todo.txt"), "buy milk")?;
        std::fs::write(dir.join("photos/2024/cat.jpg"), vec![42u8; 2048])?;
        std::fs::write(dir.join("notes/a.md"), "# a")?;
        std::fs::write(dir.join("notes/b.md"), "# b")?;
        Ok(())
    }

    fn source_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .map(|de| de.unwrap())
            .filter(|de| de.file_type().is_file())
            .map(|de| {
                let rel = de.path().strip_prefix(dir).unwrap();
                let name = rel.components().map(|c| c.as_os_str().to_string_lossy()).join("/");
                (name, std::fs::read(de.path()).unwrap())
            })
            .collect()
    }

    fn archive_files(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut f = archive.by_index(i).unwrap();
                let mut buf = Vec::new();
                f.read_to_end(&mut buf).unwrap();
                (f.name().to_string(), buf)
            })
            .sorted()
            .collect()
    }

    fn config(src: &TempDir, root: &TempDir) -> BackupConfig {
        BackupConfig::builder()
            .source_dir(src.path())
            .backup_root(root.path())
            .build()
    }

    #[test]
    fn test_run_produces_archive_and_removes_staged_folder() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();

        let mut events: Vec<ProgressEvent> = Vec::new();
        let outcome = config(&src, &root)
            .run(march(), &mut events, &Interrupt::new())
            .unwrap();

        assert_eq!(outcome.targets().staged_dir(), &root.path().join("March"));
        assert_eq!(outcome.targets().archive_path(), &root.path().join("March.zip"));
        assert!(!root.path().join("March").exists());
        assert!(std::fs::metadata(root.path().join("March.zip")).unwrap().len() > 0);
        assert!(outcome.cleanup_error().is_none());
        assert_eq!(outcome.stage_report().copied().count(), 3);
        assert_eq!(*outcome.archived_files(), 4);

        let mut expected = source_files(src.path());
        expected.sort();
        assert_eq!(archive_files(&root.path().join("March.zip")), expected);

        let staging = events.iter().filter(|e| e.phase == Phase::Staging).count();
        let archiving = events.iter().filter(|e| e.phase == Phase::Archiving).count();
        assert_eq!((staging, archiving), (3, 4));
        assert_eq!(events.last().map(|e| (e.completed, e.total)), Some((4, 4)));
    }

    #[test]
    fn test_run_twice_in_same_month_gets_suffixes() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();
        let cfg = config(&src, &root);

        cfg.run(march(), &mut no_progress(), &Interrupt::new()).unwrap();
        let second = cfg.run(march(), &mut no_progress(), &Interrupt::new()).unwrap();

        // The month folder is free again, only the archive name collides.
        assert_eq!(second.targets().staged_dir(), &root.path().join("March"));
        assert_eq!(second.targets().archive_path(), &root.path().join("March_1.zip"));
        assert!(root.path().join("March.zip").is_file());
        assert!(root.path().join("March_1.zip").is_file());
    }

    #[test]
    fn test_empty_source_leaves_backup_root_untouched() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        let res = config(&src, &root).run(march(), &mut no_progress(), &Interrupt::new());

        assert!(matches!(res, Err(Error::NothingToBackUp(_))));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directories_fail_validation() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let cfg = BackupConfig::builder()
            .source_dir(src.path().join("nope"))
            .backup_root(root.path())
            .build();

        let err = cfg.run(march(), &mut no_progress(), &Interrupt::new()).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_interrupted_run_cleans_up() {
        struct InterruptOnFirstEvent(Interrupt);
        impl ProgressObserver for InterruptOnFirstEvent {
            fn on_progress(&mut self, _completed: usize, _total: usize, _phase: Phase) {
                self.0.trigger();
            }
        }

        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();
        let interrupt = Interrupt::new();

        let err = config(&src, &root)
            .run(march(), &mut InterruptOnFirstEvent(interrupt.clone()), &interrupt)
            .unwrap_err();

        assert!(err.is_interrupted());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_archive_leaves_foreign_archive_alone() {
        struct ForeignArchiveWriter(PathBuf);
        impl ProgressObserver for ForeignArchiveWriter {
            fn on_progress(&mut self, _completed: usize, _total: usize, phase: Phase) {
                if phase == Phase::Staging {
                    std::fs::write(&self.0, "someone else's backup").unwrap();
                }
            }
        }

        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();
        let foreign = root.path().join("March.zip");

        let res = config(&src, &root).run(
            march(),
            &mut ForeignArchiveWriter(foreign.clone()),
            &Interrupt::new(),
        );

        assert!(res.is_err());
        assert_eq!(
            std::fs::read_to_string(&foreign).unwrap(),
            "someone else's backup"
        );
        assert!(!root.path().join("March").exists());
    }

    #[test]
    fn test_archive_failure_after_staging_cleans_up() {
        struct RemoveStagedFileWhileZipping(PathBuf);
        impl ProgressObserver for RemoveStagedFileWhileZipping {
            fn on_progress(&mut self, completed: usize, _total: usize, phase: Phase) {
                if phase == Phase::Archiving && completed == 1 {
                    std::fs::remove_file(&self.0).unwrap();
                }
            }
        }

        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();
        // Archived last, after notes/ and photos/.
        let staged_todo = root.path().join("March").join("todo.txt");

        let err = config(&src, &root)
            .run(
                march(),
                &mut RemoveStagedFileWhileZipping(staged_todo),
                &Interrupt::new(),
            )
            .unwrap_err();

        assert!(!err.is_interrupted());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cleanup_failure_still_reports_success() {
        struct ReplaceStagedDirWithFile(PathBuf);
        impl ProgressObserver for ReplaceStagedDirWithFile {
            fn on_progress(&mut self, _completed: usize, _total: usize, _phase: Phase) {}

            fn on_phase_complete(&mut self, phase: Phase) {
                if phase == Phase::Archiving {
                    std::fs::remove_dir_all(&self.0).unwrap();
                    std::fs::write(&self.0, "in the way").unwrap();
                }
            }
        }

        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        create_source(src.path()).unwrap();

        let outcome = config(&src, &root)
            .run(
                march(),
                &mut ReplaceStagedDirWithFile(root.path().join("March")),
                &Interrupt::new(),
            )
            .unwrap();

        assert!(outcome.cleanup_error().is_some());
        assert_eq!(*outcome.archived_files(), 4);
        assert!(std::fs::metadata(root.path().join("March.zip")).unwrap().len() > 0);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.yml");
        std::fs::write(&path, "source_dir: /srv/data\nbackup_root: /mnt/backups\n").unwrap();

        let cfg = BackupConfig::from_yaml_file(&path).unwrap();
        assert_eq!(cfg.source_dir(), &PathBuf::from("/srv/data"));
        assert_eq!(cfg.backup_root(), &PathBuf::from("/mnt/backups"));
    }

    #[test]
    fn test_from_yaml_file_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.yml");
        std::fs::write(&path, "source_dir: /a\nbackup_root: /b\ncron: '* * *'\n").unwrap();

        let err = BackupConfig::from_yaml_file(&path).unwrap_err();
        assert!(err.to_string().contains("Parse YAML config failed"));
    }
}
