//! leap_desktop — gesture listener entry point.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use leap_desktop::action::{CommandRunner, DryRunRunner, ProcessRunner};
use leap_desktop::script::ScriptGestureSource;
use leap_desktop::{Controller, DesktopConfig, Dispatcher, LogConfig};

#[derive(Parser)]
#[command(name = "leap_desktop")]
#[command(about = "Switch desktops and lock the screen with LeapMotion gestures")]
struct Cli {
    /// Config file path (default: ~/.config/leap-desktop/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay a gesture script instead of reading the sensor ("-" for stdin)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Delay after each scripted frame, in milliseconds
    #[arg(long, default_value_t = 0)]
    pace_ms: u64,

    /// Log level (error, warn, info, debug, trace); overrides the config
    #[arg(long)]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,

    /// Log a summary line for two-handed frames
    #[arg(long)]
    frame_summaries: bool,

    /// Log the commands gestures would run without running them
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli.config.clone().unwrap_or_else(DesktopConfig::default_path);
    let config = DesktopConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Logging
    let log = log_config(&cli, &config);
    log.install()?;
    info!("Config: {}", config_path.display());

    let runner: Box<dyn CommandRunner> = if cli.dry_run {
        Box::new(DryRunRunner)
    } else {
        Box::new(ProcessRunner)
    };
    let dispatcher = Dispatcher::new(&config, &log, runner);

    let mut controller = open_controller(&cli)?;
    controller.add_listener(dispatcher)?;

    // Keep this process running until Ctrl+C or the source runs dry
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || running_clone.store(false, Ordering::SeqCst)) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    info!("Ready!");
    while running.load(Ordering::SeqCst) && !controller.is_finished() {
        thread::sleep(Duration::from_millis(100));
    }

    controller.remove_listener();
    Ok(())
}

fn log_config(cli: &Cli, config: &DesktopConfig) -> LogConfig {
    let mut log = LogConfig::from_config(&config.logging);
    if let Some(level) = &cli.log_level {
        log.level = level.clone();
    }
    if cli.log_file.is_some() {
        log.file = cli.log_file.clone();
    }
    if cli.no_color {
        log.color = false;
    }
    log.frame_summaries |= cli.frame_summaries;
    log
}

fn open_controller(cli: &Cli) -> Result<Controller> {
    let pace = Duration::from_millis(cli.pace_ms);
    let controller = match cli.script.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            Controller::new(ScriptGestureSource::stdin().with_pace(pace))?
        }
        Some(path) => {
            let source = ScriptGestureSource::from_path(path)?.with_pace(pace);
            info!("Replaying {} events from {}", source.len(), path.display());
            Controller::new(source)?
        }
        None => hardware_controller(pace)?,
    };
    Ok(controller)
}

#[cfg(feature = "leap")]
fn hardware_controller(_pace: Duration) -> Result<Controller> {
    info!("Mode: LeapMotion hardware");
    Ok(Controller::new(leap_desktop::leap::LeapGestureSource)?)
}

#[cfg(not(feature = "leap"))]
fn hardware_controller(pace: Duration) -> Result<Controller> {
    info!("Mode: script on stdin  (use --features leap for hardware)");
    Ok(Controller::new(ScriptGestureSource::stdin().with_pace(pace))?)
}
