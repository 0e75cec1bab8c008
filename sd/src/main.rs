//! scraperd - scraping-job orchestration daemon
//!
//! CLI entry point for launching and managing the daemon.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{error, info, warn};

use scraperd::cli::{Cli, Command, OutputFormat, get_log_path};
use scraperd::config::Config;
use scraperd::cron::{HealthMonitor, PeriodicEnqueuer, RetentionSweeper};
use scraperd::daemon::DaemonManager;
use scraperd::domain::TaskOrigin;
use scraperd::executor::CommandExecutor;
use scraperd::scheduler::Scheduler;
use scraperd::worklist::AirtableWorklist;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scraperd")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("scraperd.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Start { foreground }) => cmd_start(&config, foreground).await,
        Some(Command::Stop) => cmd_stop().await,
        Some(Command::Status { format }) => cmd_status(format).await,
        Some(Command::Logs { follow, lines }) => cmd_logs(follow, lines).await,
        Some(Command::Run {
            hashtag,
            num_profiles,
            priority,
        }) => cmd_run(&config, &hashtag, num_profiles, priority).await,
        Some(Command::RunDaemon) => cmd_run_daemon(&config).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Start the daemon
async fn cmd_start(config: &Config, foreground: bool) -> Result<()> {
    let daemon = DaemonManager::new();

    if daemon.is_running() {
        println!("scraperd is already running (PID: {})", daemon.running_pid().unwrap());
        return Ok(());
    }

    if foreground {
        println!("Starting scraperd in foreground mode...");
        run_daemon(config).await
    } else {
        let pid = daemon.start()?;
        println!("scraperd started (PID: {})", pid);
        Ok(())
    }
}

/// Stop the daemon
async fn cmd_stop() -> Result<()> {
    let daemon = DaemonManager::new();

    if !daemon.is_running() {
        println!("scraperd is not running");
        return Ok(());
    }

    let pid = daemon.running_pid().unwrap();
    daemon.stop()?;
    println!("scraperd stopped (was PID: {})", pid);
    Ok(())
}

/// Show daemon status
async fn cmd_status(format: OutputFormat) -> Result<()> {
    let daemon = DaemonManager::new();
    let status = daemon.status();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "running": status.running,
                "pid": status.pid,
                "pid_file": status.pid_file.to_string_lossy(),
                "version": daemon.read_version(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("scraperd Status");
            println!("---------------");
            if status.running {
                println!("Status: running");
                println!("PID: {}", status.pid.unwrap());
                if let Some(version) = daemon.read_version() {
                    println!("Version: {}", version);
                }
            } else {
                println!("Status: stopped");
            }
            println!("PID file: {}", status.pid_file.display());
        }
    }

    Ok(())
}

/// Show logs
async fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Run a single scrape job in the foreground (batch mode)
async fn cmd_run(config: &Config, hashtag: &str, num_profiles: Option<u32>, priority: Option<i32>) -> Result<()> {
    let num_profiles = num_profiles.unwrap_or(config.scraper.default_num_profiles);
    let priority = priority.unwrap_or(config.scheduler.default_priority);

    println!("Running scrape job");
    println!("  Hashtag: {}", hashtag);
    println!("  Profiles: {}", num_profiles);
    println!();

    let executor = Arc::new(CommandExecutor::from_config(&config.scraper));
    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone(), executor));

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let dispatcher = Arc::clone(&scheduler);
    let dispatcher_handle = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    let task_id = scheduler.submit(hashtag, num_profiles, TaskOrigin::Api, priority).await?;
    println!("Task queued: {}", task_id);

    // Poll until the job reaches a terminal state
    let record = loop {
        let record = scheduler.status(&task_id).await?;
        if record.is_terminal() {
            break record;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    };

    let _ = shutdown_tx.send(()).await;
    let _ = dispatcher_handle.await;

    match record.status {
        scraperd::TaskStatus::Completed => {
            println!("\n✓ Scrape completed for hashtag: {}", hashtag);
        }
        scraperd::TaskStatus::Failed => {
            println!("\n✗ Scrape failed: {}", record.error.as_deref().unwrap_or("unknown error"));
            std::process::exit(1);
        }
        status => {
            println!("\n⚠ Scrape ended in unexpected state: {}", status);
        }
    }

    Ok(())
}

/// Run as the daemon process (internal command)
async fn cmd_run_daemon(config: &Config) -> Result<()> {
    let daemon = DaemonManager::new();
    daemon.register_self()?;

    run_daemon(config).await
}

/// Run the daemon main loop
async fn run_daemon(config: &Config) -> Result<()> {
    info!("Daemon starting...");

    // Fail fast with clear error messages
    config.validate()?;

    // Initialize components
    let executor = Arc::new(CommandExecutor::from_config(&config.scraper));
    info!(command = %config.scraper.command, "Executor initialized");

    let worklist = Arc::new(AirtableWorklist::from_config(&config.airtable).context("Failed to create Airtable client")?);
    info!(table = %config.airtable.hashtags_table, "Worklist client initialized");

    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone(), executor));
    info!(max_concurrent = config.scheduler.max_concurrent, "Scheduler initialized");

    // Spawn the dispatch loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let dispatcher = Arc::clone(&scheduler);
    let dispatcher_handle = tokio::spawn(async move {
        if let Err(e) = dispatcher.run(shutdown_rx).await {
            error!(error = %e, "Dispatcher error");
        }
    });

    // Spawn timer tasks
    let enqueuer = PeriodicEnqueuer::new(Arc::clone(&scheduler), worklist, config);
    let enqueuer_handle = tokio::spawn(enqueuer.run());

    let sweeper = RetentionSweeper::new(Arc::clone(&scheduler), config);
    let sweeper_handle = tokio::spawn(sweeper.run());

    let monitor = HealthMonitor::new(Arc::clone(&scheduler), config);
    let monitor_handle = tokio::spawn(monitor.run());

    scheduler.set_timers_alive(true);
    info!("Timers started");

    info!("Daemon running. Press Ctrl+C to stop.");

    // Wait for a termination signal
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("Daemon shutting down...");

    // Stop timers first so no new work is admitted during drain
    enqueuer_handle.abort();
    sweeper_handle.abort();
    monitor_handle.abort();
    scheduler.set_timers_alive(false);

    // Dispatcher drains active jobs (bounded by the shutdown timeout)
    let _ = shutdown_tx.send(()).await;
    let _ = dispatcher_handle.await;

    info!("Shutdown complete");
    Ok(())
}
