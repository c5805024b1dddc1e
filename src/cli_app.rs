//! Top-level CLI definition and dispatch.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use crate::core::config::Config;
use crate::core::errors::{PsnError, Result};
use crate::logger::dual::DualEventLog;
use crate::logger::sqlite::SqliteEventLog;
use crate::notify::TelegramNotifier;
use crate::notify::message::format_duration;
use crate::probe::EwelinkProbe;
use crate::runner::{CycleReport, run_cycle};
use crate::state::{LoadedState, StateStore};

/// Power Sentinel — debounced availability monitoring with Telegram alerts.
#[derive(Parser)]
#[command(name = "psn", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run one monitoring cycle (the cron entry point).
    Check {
        /// Emit the structured cycle report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the monitor in the foreground with the configured interval.
    Watch,
    /// Show the current persisted state and today's statistics.
    Status {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show historical outage statistics.
    Stats {
        /// How many days back to aggregate.
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration with secrets redacted.
    Config,
    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Check { json } => check(&config, *json),
        Command::Watch => watch(&config),
        Command::Status { json } => status(&config, *json),
        Command::Stats { days, json } => stats(&config, *days, *json),
        Command::Config => {
            let text =
                toml::to_string_pretty(&config.redacted()).map_err(|e| PsnError::Serialization {
                    context: "toml",
                    details: e.to_string(),
                })?;
            print!("{text}");
            Ok(())
        }
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "psn", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn check(config: &Config, json: bool) -> Result<()> {
    config.validate_for_cycle()?;
    let probe = EwelinkProbe::from_config(&config.probe)?;
    let notifier = TelegramNotifier::from_config(&config.telegram)?;
    let store = StateStore::new(&config.paths.state_file);
    let events = DualEventLog::open(&config.paths);
    if let Some(reason) = events.degraded() {
        eprintln!("{} {reason}", "warning:".yellow());
    }

    let report = run_cycle(&probe, &store, &notifier, &events, config);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn watch(config: &Config) -> Result<()> {
    config.validate_for_cycle()?;
    let probe = EwelinkProbe::from_config(&config.probe)?;
    let notifier = TelegramNotifier::from_config(&config.telegram)?;
    let store = StateStore::new(&config.paths.state_file);
    let events = DualEventLog::open(&config.paths);

    println!(
        "🔌 watching every {}s (stop with Ctrl-C)",
        config.watch.interval_secs
    );
    crate::runner::watch::run_watch(&probe, &store, &notifier, &events, config, |report| {
        print_report(report);
    })
}

fn status(config: &Config, json: bool) -> Result<()> {
    let store = StateStore::new(&config.paths.state_file);
    let record = match store.load() {
        LoadedState::Present(record) => Some(record),
        LoadedState::Absent | LoadedState::Corrupt { .. } => None,
    };
    let today = SqliteEventLog::open(&config.paths.events_db)
        .and_then(|log| log.stats_today())
        .ok();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "state": record,
                "today": today,
            }))?
        );
        return Ok(());
    }

    match record {
        Some(record) => {
            let marker = if record.online {
                "🟢 online".green()
            } else {
                "🔴 offline".red()
            };
            println!("status: {marker}");
            println!("since:  {}", record.status_changed_at);
            if let Some(draft) = record.draft_off_time {
                println!("draft:  pending since {draft}");
            }
        }
        None => println!("status: {}", "unknown (no state yet)".dimmed()),
    }
    if let Some(today) = today {
        println!(
            "today:  {} outage(s), {} offline",
            today.outages,
            format_duration(today.offline_seconds)
        );
    }
    Ok(())
}

fn stats(config: &Config, days: i64, json: bool) -> Result<()> {
    let log = SqliteEventLog::open(&config.paths.events_db)?;
    let range = log.stats_range(days)?;
    let longest = log.longest_outage(days)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "days": days,
                "per_day": range,
                "longest_outage": longest,
            }))?
        );
        return Ok(());
    }

    if range.is_empty() {
        println!("no events in the last {days} day(s)");
        return Ok(());
    }
    for day in &range {
        println!(
            "{}  {} outage(s), {} offline",
            day.date,
            day.outages,
            format_duration(day.offline_seconds)
        );
    }
    if let Some(longest) = longest {
        println!(
            "longest outage: {}",
            format_duration(longest.duration_seconds).bold()
        );
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    for step in &report.steps {
        if step.done {
            println!("{} {}", "✓".green(), step.description);
        } else {
            println!(
                "{} {} ({})",
                "✗".red(),
                step.description,
                step.error.as_deref().unwrap_or("unknown"),
            );
        }
    }
}
