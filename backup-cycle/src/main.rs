//! Backup Cycle - Main entry point
//!
//! Takes today's full or incremental backup and prunes expired weeks.

use backup_cycle::config::{Config, LogOutput};
use backup_cycle::executor::Innobackupex;
use backup_cycle::limits;
use backup_cycle::notify::{self, Notifier, SyslogNotifier, TracingNotifier};
use backup_cycle::orchestrator::Orchestrator;
use backup_cycle::repository::FsRepository;
use backup_cycle::schedule::calendar;
use backup_cycle::utils::{self, errors::exit_code};
use backup_cycle::CycleError;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backup directory (overrides config)
    #[arg(short = 'd', long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Day of the full backup, 1 = Monday .. 7 = Sunday (overrides config)
    #[arg(short = 'w', long)]
    full_weekday: Option<u32>,

    /// Complete weeks to keep, 1-52 (overrides config)
    #[arg(short = 'k', long)]
    weeks_to_keep: Option<u32>,

    /// Open files limit for the backup tool (overrides config)
    #[arg(short = 'n', long)]
    open_files: Option<u64>,

    /// Backup tool binary (overrides config)
    #[arg(short, long)]
    tool: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Send notifications to syslog
    #[arg(long)]
    syslog: bool,

    /// Run as if today were this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Show what would be backed up and purged without doing it
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.base_dir {
            config.backup.base_dir = dir.clone();
        }
        if let Some(weekday) = self.full_weekday {
            config.backup.full_weekday = weekday;
        }
        if let Some(weeks) = self.weeks_to_keep {
            config.backup.weeks_to_keep = weeks;
        }
        if let Some(limit) = self.open_files {
            config.limits.open_files = Some(limit);
        }
        if let Some(tool) = &self.tool {
            config.tool.path = tool.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.syslog {
            config.log.output = LogOutput::Syslog;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // A broken config file is reported through the notifier, so logging
    // starts from the defaults plus the command line overrides.
    let loaded = Config::load(args.config.as_deref());
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    args.apply(&mut config);

    // Initialize logging
    if let Err(e) = utils::logger::init(&config.log.level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let host = notify::local_hostname();
    let notifier: Box<dyn Notifier> = match config.log.output {
        LogOutput::Stdout => Box::new(TracingNotifier::new(host)),
        LogOutput::Syslog => Box::new(SyslogNotifier::new(config.log.syslog_tag.clone(), host)),
    };

    if let Err(e) = loaded {
        notifier.err(&e.to_string());
        return ExitCode::from(e.exit_code());
    }

    info!("Starting backup-cycle v{}", env!("CARGO_PKG_VERSION"));

    match run(&args, &config, notifier).await {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            // Already notified where it was raised.
            debug!("Exiting with status {}: {}", e.exit_code(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: &Args, config: &Config, notifier: Box<dyn Notifier>) -> Result<(), CycleError> {
    config
        .validate()
        .inspect_err(|e| notifier.err(&e.to_string()))?;

    let today = args.date.unwrap_or_else(calendar::today);
    let base_dir = &config.backup.base_dir;
    let repo = FsRepository::new(base_dir);
    let executor = Innobackupex::new(config.tool.path.clone(), config.tool.args.clone());

    if args.dry_run {
        let orchestrator = Orchestrator::new(config, repo, executor, notifier);
        let decision = orchestrator.decide(today)?;
        info!(
            "Dry run: {} into {}",
            decision.target,
            decision.target.location_in(base_dir).data_path.display()
        );

        match orchestrator.plan(decision.anchor.date) {
            Ok(plan) if plan.deletions().is_empty() => {
                info!("Dry run: nothing to purge, no full backup from {}", plan.target());
            }
            Ok(plan) => {
                for deletion in plan.deletions() {
                    info!("Dry run: would remove {}", deletion.location.data_path.display());
                }
            }
            Err(e) => warn!("Dry run: purge would be skipped: {}", e),
        }
        return Ok(());
    }

    if let Some(limit) = config.limits.open_files {
        limits::set_open_files(limit).inspect_err(|e| notifier.err(&e.to_string()))?;
    }

    let orchestrator = Orchestrator::new(config, repo, executor, notifier);
    let report = orchestrator.run(today).await?;

    info!(
        "{} finished: {} sets purged, {} purge failures{}",
        report.decision.target,
        report.purge.removed.len(),
        report.purge.failures.len(),
        if report.purge.skipped { ", purge skipped" } else { "" }
    );

    Ok(())
}
