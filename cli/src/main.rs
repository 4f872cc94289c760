// localnotify: developer CLI for the notification bridge
//
// Drives the facade against a simulated native side and prints every
// command it dispatches and every lifecycle event it gets back.

mod config;
mod simulator;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use localnotify_core::notification::now_epoch_seconds;
use localnotify_core::{
    AppState, ChannelExecutor, LifecycleEvent, LocalNotification, Notification, NotificationBatch,
    NotificationId, Platform, ScheduleTime,
};
use serde_json::Value;
use simulator::{NativeSimulator, SimulatorReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "localnotify")]
#[command(about = "Local notification bridge: drive the facade against a simulated device", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Platform the simulated device reports (Android, iOS, WinCE, Win32NT, ...)
    #[arg(short, long, global = true)]
    platform: Option<String>,

    /// Report lifecycle events as if the app were in the background
    #[arg(long, global = true)]
    background: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show (or persistently override) default notification settings
    Defaults {
        /// KEY=VALUE override to store in the config file
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Remove a stored override
        #[arg(long, value_name = "KEY")]
        unset: Vec<String>,
    },
    /// Schedule one notification
    Add(AddArgs),
    /// Schedule a batch read from a JSON file ("-" for stdin)
    AddMulti {
        file: PathBuf,
        /// Cancel everything already scheduled first
        #[arg(long)]
        cancel_all: bool,
    },
    /// Cancel one notification
    Cancel { id: String },
    /// Cancel every notification
    CancelAll,
    /// Query (and optionally prompt for) notification permission
    Permission {
        #[arg(long)]
        prompt: bool,
        /// Simulate a device where permission has not been granted
        #[arg(long)]
        deny: bool,
    },
    /// Scripted run: schedule, wait for triggers, click, query and cancel
    Simulate {
        #[arg(short, long, default_value = "3")]
        count: u32,
        /// Seconds between notifications
        #[arg(short, long, default_value = "1")]
        interval: u64,
    },
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    id: Option<String>,
    #[arg(short, long)]
    message: Option<String>,
    #[arg(short, long)]
    title: Option<String>,
    #[arg(long)]
    badge: Option<i64>,
    /// Epoch seconds, RFC 3339, or +SECONDS from now
    #[arg(short, long)]
    date: Option<String>,
    #[arg(long)]
    json: Option<String>,
    #[arg(long)]
    repeat: Option<String>,
    #[arg(long)]
    sound: Option<String>,
    #[arg(long)]
    auto_cancel: bool,
    /// Extra descriptor field
    #[arg(long, value_name = "KEY=VALUE")]
    field: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = config::Config::load(cli.config.as_deref())?;
    let platform = config.platform(cli.platform.as_deref());
    let state = if cli.background {
        AppState::Background
    } else {
        AppState::Foreground
    };

    match cli.command {
        Commands::Defaults { set, unset } => cmd_defaults(&mut config, platform, set, unset),
        Commands::Add(args) => cmd_add(&config, platform, state, args).await,
        Commands::AddMulti { file, cancel_all } => {
            cmd_add_multi(&config, platform, state, file, cancel_all).await
        }
        Commands::Cancel { id } => cmd_cancel(&config, platform, state, id).await,
        Commands::CancelAll => cmd_cancel_all(&config, platform, state).await,
        Commands::Permission { prompt, deny } => {
            cmd_permission(&config, platform, state, prompt, deny).await
        }
        Commands::Simulate { count, interval } => {
            cmd_simulate(&config, platform, state, count, interval).await
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// A facade wired to a simulated device for the length of one command.
struct Session {
    facade: LocalNotification<ChannelExecutor>,
    worker: JoinHandle<SimulatorReport>,
}

impl Session {
    fn start(config: &config::Config, platform: Platform, state: AppState, permission: bool) -> Self {
        let (executor, rx) = ChannelExecutor::new();
        let mut bridge = config.bridge.clone();
        bridge.platform = Some(platform.clone());
        // The simulated device answers schedule queries.
        bridge.query_commands = true;
        let facade = LocalNotification::from_config(&bridge, executor);
        facade.subscribe(Arc::new(|event: &LifecycleEvent| simulator::print_event(event)));

        let worker = NativeSimulator::new(facade.listeners(), platform)
            .with_permission(permission)
            .with_state(state)
            .spawn(rx);

        Self { facade, worker }
    }

    /// Close the command channel and wait for the device to drain it.
    async fn finish(self) -> Result<SimulatorReport> {
        drop(self.facade);
        self.worker.await.context("Simulated device task failed")
    }
}

async fn ask_permission(facade: &LocalNotification<ChannelExecutor>) -> Result<bool> {
    let (tx, rx) = oneshot::channel();
    facade.has_permission(move |granted| {
        let _ = tx.send(granted);
    });
    rx.await.context("Device dropped the permission query")
}

async fn scheduled_ids(facade: &LocalNotification<ChannelExecutor>) -> Result<Vec<NotificationId>> {
    let (tx, rx) = oneshot::channel();
    facade.get_scheduled_ids(move |ids| {
        let _ = tx.send(ids);
    });
    rx.await.context("Device dropped the scheduled-ids query")
}

fn parse_pair(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got {:?}", raw))?;
    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

fn parse_date(raw: &str) -> Result<ScheduleTime> {
    if let Some(offset) = raw.strip_prefix('+') {
        let secs: i64 = offset.parse().context("Invalid relative date")?;
        return Ok(ScheduleTime::At(chrono::Utc::now() + chrono::Duration::seconds(secs)));
    }
    let value = match raw.parse::<i64>() {
        Ok(secs) => Value::from(secs),
        Err(_) => Value::from(raw),
    };
    ScheduleTime::from_value(&value)?.context("Date must not be empty")
}

fn print_report(report: &SimulatorReport) {
    println!();
    println!(
        "{} {} commands, {} triggered, {} still scheduled",
        "✓".green(),
        report.commands,
        report.triggered,
        report.pending.len()
    );
}

// ============================================================================
// COMMANDS
// ============================================================================

fn cmd_defaults(
    config: &mut config::Config,
    platform: Platform,
    set: Vec<String>,
    unset: Vec<String>,
) -> Result<()> {
    for raw in &set {
        let (key, value) = parse_pair(raw)?;
        config.set_default(&key, &value.to_string())?;
        println!("{} Set default {} = {}", "✓".green(), key.bright_cyan(), value);
    }
    for key in &unset {
        if config.unset_default(key)? {
            println!("{} Removed default {}", "✓".green(), key.bright_cyan());
        } else {
            println!("{} No stored default for {}", "•".dimmed(), key);
        }
    }

    let (executor, _rx) = ChannelExecutor::new();
    let mut bridge = config.bridge.clone();
    bridge.platform = Some(platform.clone());
    let facade = LocalNotification::from_config(&bridge, executor);

    println!("{} ({})", "Default settings".bold(), platform.to_string().bright_yellow());
    println!("  {}", config.path().display().to_string().dimmed());
    println!();
    let defaults = facade.defaults();
    for key in defaults.keys() {
        let value = defaults.get(key).cloned().unwrap_or(Value::Null);
        let stored = config.bridge.defaults.contains_key(key);
        let marker = if stored { "*".bright_green() } else { " ".normal() };
        println!("  {}{:<14} {}", marker, key.bright_cyan(), value);
    }
    for key in config.bridge.defaults.keys().filter(|k| !defaults.contains_key(k)) {
        println!("  {} {} is not a default setting and is ignored", "!".yellow(), key);
    }
    Ok(())
}

async fn cmd_add(
    config: &config::Config,
    platform: Platform,
    state: AppState,
    args: AddArgs,
) -> Result<()> {
    let mut notification = Notification::new();
    if let Some(id) = args.id {
        notification = notification.id(id);
    }
    if let Some(message) = args.message {
        notification = notification.message(message);
    }
    if let Some(title) = args.title {
        notification = notification.title(title);
    }
    if let Some(badge) = args.badge {
        notification = notification.badge(badge);
    }
    if let Some(date) = args.date {
        notification = notification.date(parse_date(&date)?);
    }
    if let Some(json) = args.json {
        notification = notification.json(json);
    }
    if let Some(repeat) = args.repeat {
        notification = notification.repeat(repeat);
    }
    if let Some(sound) = args.sound {
        notification = notification.sound(sound);
    }
    if args.auto_cancel {
        notification = notification.auto_cancel(true);
    }
    for raw in &args.field {
        let (key, value) = parse_pair(raw)?;
        notification = notification.field(key, value);
    }

    let session = Session::start(config, platform, state, true);
    let id = session.facade.add(notification)?;
    println!("{} Scheduled notification {}", "✓".green(), id.as_str().bright_cyan());
    print_report(&session.finish().await?);
    Ok(())
}

async fn cmd_add_multi(
    config: &config::Config,
    platform: Platform,
    state: AppState,
    file: PathBuf,
    cancel_all: bool,
) -> Result<()> {
    let contents = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };
    let json: Value = serde_json::from_str(&contents).context("Batch file is not valid JSON")?;

    // A bare array is shorthand for {"notifications": [...]}.
    let mut batch = match json {
        Value::Array(items) => {
            let notifications = items
                .into_iter()
                .map(Notification::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            NotificationBatch::new(notifications)
        }
        other => NotificationBatch::from_json(other)?,
    };
    if cancel_all {
        batch = batch.cancel_all(true);
    }
    let count = batch.notifications.as_ref().map_or(0, Vec::len);

    let session = Session::start(config, platform, state, true);
    session.facade.add_multi(batch)?;
    println!("{} Sent batch of {} notifications", "✓".green(), count);
    print_report(&session.finish().await?);
    Ok(())
}

async fn cmd_cancel(
    config: &config::Config,
    platform: Platform,
    state: AppState,
    id: String,
) -> Result<()> {
    let session = Session::start(config, platform, state, true);
    session.facade.cancel(id.as_str());
    println!("{} Cancel sent for {}", "✓".green(), id.bright_cyan());
    session.finish().await?;
    Ok(())
}

async fn cmd_cancel_all(config: &config::Config, platform: Platform, state: AppState) -> Result<()> {
    let session = Session::start(config, platform, state, true);
    session.facade.cancel_all();
    println!("{} Cancel-all sent", "✓".green());
    session.finish().await?;
    Ok(())
}

async fn cmd_permission(
    config: &config::Config,
    platform: Platform,
    state: AppState,
    prompt: bool,
    deny: bool,
) -> Result<()> {
    let session = Session::start(config, platform, state, !deny);

    let granted = ask_permission(&session.facade).await?;
    println!("  Permission: {}", format_flag(granted));

    if prompt && !granted {
        session.facade.prompt_for_permission();
        let granted = ask_permission(&session.facade).await?;
        println!("  After prompt: {}", format_flag(granted));
    }

    session.finish().await?;
    Ok(())
}

async fn cmd_simulate(
    config: &config::Config,
    platform: Platform,
    state: AppState,
    count: u32,
    interval: u64,
) -> Result<()> {
    println!("{} on {}", "Simulating device".bold(), platform.to_string().bright_yellow());
    println!();

    let session = Session::start(config, platform, state, true);
    let facade = &session.facade;
    facade.ready();

    let start = now_epoch_seconds();
    let mut ids = Vec::new();
    for n in 1..=count {
        let offset = i64::from(n) * interval as i64;
        let notification = Notification::new()
            .id(n)
            .title(format!("Reminder {}", n))
            .message(format!("Fires {}s after start", offset))
            .json(serde_json::json!({ "seq": n }).to_string())
            .date(start + offset);
        ids.push(facade.add(notification)?);
    }

    let scheduled = scheduled_ids(facade).await?;
    println!("  Scheduled: {}", format_ids(&scheduled));

    // One spare interval so the last trigger lands before we check.
    let wait = Duration::from_secs(u64::from(count) * interval + interval.max(1));
    tokio::time::sleep(wait).await;

    if let Some(first) = ids.first() {
        facade.dispatch_hook("onclick", first.as_str(), state.as_str(), "")?;
    }

    let remaining = scheduled_ids(facade).await?;
    println!("  Remaining: {}", format_ids(&remaining));
    facade.cancel_all();

    print_report(&session.finish().await?);
    Ok(())
}

fn format_flag(flag: bool) -> ColoredString {
    if flag {
        "granted".green()
    } else {
        "not granted".red()
    }
}

fn format_ids(ids: &[NotificationId]) -> String {
    if ids.is_empty() {
        return "(none)".dimmed().to_string();
    }
    ids.iter().map(NotificationId::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair_types() {
        assert_eq!(parse_pair("badge=3").unwrap(), ("badge".to_string(), Value::from(3)));
        assert_eq!(parse_pair("title=Hi").unwrap(), ("title".to_string(), Value::from("Hi")));
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn test_parse_date_forms() {
        assert_eq!(parse_date("1704067200").unwrap().epoch_seconds(), 1_704_067_200);
        assert_eq!(
            parse_date("2024-01-01T00:00:00Z").unwrap().epoch_seconds(),
            1_704_067_200
        );

        let relative = parse_date("+60").unwrap().epoch_seconds();
        assert!((relative - (now_epoch_seconds() + 60)).abs() <= 1);

        assert!(parse_date("tomorrow").is_err());
    }
}
