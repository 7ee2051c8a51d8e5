use std::{path::Path, process::ExitCode, sync::mpsc};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use pomo::{
    analysis::{self, DurationPolicy},
    backend::Capabilities,
    cli::Args,
    config::{self, Config},
    error::PomoError,
    record,
    session::{ControlSignal, SESSION_SECS, SessionController, SessionOutcome},
    util::setup_tracing,
};

fn main() -> ExitCode {
    setup_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pomo error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut config = Config::load();

    // CLI overrides
    if let Some(log) = &args.log { config.log_file = Some(log.clone()); }
    if args.no_sound { config.sound_enabled = false; }
    if args.headless {
        config.desktop_notifications = false;
        config.interactive_display = false;
    }
    if let Some(policy) = args.pause_policy { config.pause_policy = policy; }
    if args.nominal { config.duration_policy = DurationPolicy::Nominal; }

    match &args.analyse {
        Some(path) => analyse(path, args, &config),
        None => run_session(args, &config),
    }
}

fn analyse(path: &Path, args: &Args, config: &Config) -> Result<ExitCode> {
    let parsed = match analysis::read_log(path) {
        Ok(parsed) => parsed,
        Err(err @ PomoError::LogUnreadable { .. }) => {
            eprintln!("{err}");
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to analyse {}", path.display()));
        }
    };

    for warning in &parsed.warnings {
        if args.json {
            eprintln!("{warning}");
        } else {
            println!("{warning}");
        }
    }

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let report = analysis::summarize(&parsed.records, today, config.duration_policy);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", analysis::render_report(&report));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_session(args: &Args, config: &Config) -> Result<ExitCode> {
    let caps = Capabilities::probe(config);
    let (control_tx, control_rx) = mpsc::sync_channel(1);

    let interrupt = control_tx.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = interrupt.try_send(ControlSignal::Abort);
    }) {
        warn!(%err, "could not install Ctrl-C handler");
    }

    let task = record::task_label(args.task.as_deref());
    let display = caps.display(&task, control_tx);
    let mut controller = SessionController::new(caps.notifier(), display, control_rx)
        .with_pause_policy(config.pause_policy);
    if let Some(tick) = config::tick_override() {
        controller = controller.with_tick(tick);
    }

    let outcome = controller
        .start(Some(task.as_str()), SESSION_SECS)
        .context("session failed to run")?;

    match &outcome {
        SessionOutcome::Completed(record) => {
            let log_path = config.log_path();
            match record::append_record(&log_path, record) {
                Ok(()) => info!(path = %log_path.display(), "session logged"),
                Err(err) => {
                    // The session still counts; only the log entry is lost.
                    warn!(%err, "log append failed");
                    eprintln!("{err}");
                }
            }
        }
        SessionOutcome::Aborted { task, .. } => {
            println!("Session \"{task}\" aborted; nothing logged.");
        }
    }

    Ok(ExitCode::SUCCESS)
}
