use chrono::Local;
use clap::Parser;
use month_zip_backup::backup::backup_config::{BackupConfig, BackupOutcome};
use month_zip_backup::backup::interrupt::Interrupt;
use month_zip_backup::backup::progress::ConsoleProgress;
use month_zip_backup::backup::prompt::{Prompter, BACKUP_ROOT_QUESTION, SOURCE_QUESTION};
use month_zip_backup::backup::result_error::error::Error;
use month_zip_backup::backup::result_error::result::Result;
use month_zip_backup::backup::result_error::WithMsg;
use month_zip_backup::backup::validate::normalize_separators;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing::{debug, error, warn};
use validator::Validate;

/// Copy a directory into a month-named folder, zip it, then remove the copy
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML file with `source_dir` and `backup_root`
    #[arg(short, long, conflicts_with_all = ["source", "backup_root"])]
    config: Option<PathBuf>,
    /// Directory to back up, asked for when missing
    #[arg(short, long)]
    source: Option<String>,
    /// Directory the backups go to, asked for when missing
    #[arg(short, long)]
    backup_root: Option<String>,
    /// Do not wait for Enter once the backup is done
    #[arg(long)]
    no_pause: bool,
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();
    let interrupt = match Interrupt::install_ctrlc_handler() {
        Ok(interrupt) => interrupt,
        Err(e) => {
            error!("An error occurred: {e}");
            exit(1);
        }
    };
    let mut prompter = Prompter::new(std::io::stdin().lock(), std::io::stdout())
        .with_interrupt(interrupt.clone());

    match run(&args, &mut prompter, &interrupt) {
        Ok(()) => return,
        Err(e) if e.is_interrupted() => on_interrupt(&mut prompter, &e),
        Err(e) => {
            error!("An error occurred: {e}");
            if let Err(e2) = prompter.say(format!("An error occurred: {e}")) {
                debug!("{e2}");
            }
        }
    }

    exit(1);
}

fn run<R: BufRead, W: Write>(
    args: &Args,
    prompter: &mut Prompter<R, W>,
    interrupt: &Interrupt,
) -> Result<()> {
    prompter.say("Welcome to the Backup Program!")?;
    let config = load_config(args, prompter)?;

    let outcome = config.run(
        Local::now().date_naive(),
        &mut ConsoleProgress::stdout(),
        interrupt,
    )?;
    report(prompter, &outcome)?;

    if args.no_pause {
        prompter.say("Backup process completed successfully!")
    } else {
        prompter.acknowledge("Backup process completed successfully!")
    }
}

fn load_config<R: BufRead, W: Write>(
    args: &Args,
    prompter: &mut Prompter<R, W>,
) -> Result<BackupConfig> {
    let config = match &args.config {
        Some(path) => BackupConfig::from_yaml_file(path)?,
        None => {
            let source_dir = match &args.source {
                Some(raw) => normalize_separators(raw),
                None => prompter.ask_path(SOURCE_QUESTION)?,
            };
            let backup_root = match &args.backup_root {
                Some(raw) => normalize_separators(raw),
                None => prompter.ask_path(BACKUP_ROOT_QUESTION)?,
            };
            BackupConfig::builder()
                .source_dir(source_dir)
                .backup_root(backup_root)
                .build()
        }
    };

    config
        .validate()
        .map_err(Error::from)
        .map(|_| config)
        .with_msg("Config validation failed")
}

fn report<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    outcome: &BackupOutcome,
) -> Result<()> {
    let stage_report = outcome.stage_report();
    let skipped = stage_report.skipped().count();
    let failed = stage_report.failed().count();
    if skipped + failed == 0 {
        prompter.say("All items copied successfully!")?;
    } else {
        prompter.say(format!(
            "{} item(s) copied, {skipped} skipped, {failed} failed.",
            stage_report.copied().count()
        ))?;
    }

    prompter.say(format!(
        "Zip file created: {:?} ({} file(s))",
        outcome.targets().archive_path(),
        outcome.archived_files()
    ))?;
    if outcome.cleanup_error().is_some() {
        warn!(
            "Temporary backup directory {:?} was left behind",
            outcome.targets().staged_dir()
        );
    }
    Ok(())
}

/// The interrupted phase is already unwound, so both answers end the run.
fn on_interrupt<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>, e: &Error) {
    debug!("{e}");
    let res = prompter
        .say("\nOperation interrupted by the user.")
        .and_then(|_| prompter.confirm_quit())
        .and_then(|quit| {
            if quit {
                prompter.say("Exiting program. Goodbye!")
            } else {
                prompter.say(
                    "The interrupted backup was discarded and cannot be resumed, run the program again to start over.",
                )
            }
        });
    if let Err(e) = res {
        error!("{e}");
    }
}
