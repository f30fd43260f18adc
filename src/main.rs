//! EU4 Autobackup - operator console
//!
//! # Overview
//!
//! Thin terminal front end around the [`ChangeMonitor`]. It initializes:
//! - Logging infrastructure (daily file rotation + console output)
//! - A current-thread tokio runtime for the tick loop
//! - Settings loading ([`ConfigManager`])
//! - The console probe (Enter pauses, `q` or Ctrl+C quits)
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/eu4-autobackup.<date>
//! 2. Load settings from `AutoBackup Data/autobackup.yaml`
//! 3. Show the settings menu until the operator starts monitoring
//! 4. Run the monitor until paused or terminated
//! 5. On pause, return to the settings menu and resume with what it produces
//! 6. Log the session summary on exit
//!
//! Pass `--debug` for debug-level logging.

use anyhow::Result;
use eu4_autobackup::config::DEFAULT_CONFIG_DIR;
use eu4_autobackup::console::{MenuOutcome, SettingsMenu};
use eu4_autobackup::logging::{DEFAULT_LOG_DIR, DEFAULT_LOG_PREFIX, setup_logging};
use eu4_autobackup::monitor::{ConsoleProbe, TracingSink};
use eu4_autobackup::{
    APP_NAME, ChangeMonitor, ConfigManager, Metrics, SessionExit, UserSettings, VERSION,
};
use std::sync::Arc;

fn main() -> Result<()> {
    let debug_mode = std::env::args().any(|arg| arg == "--debug");
    let _guard = setup_logging(DEFAULT_LOG_DIR, DEFAULT_LOG_PREFIX, debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let config_manager = ConfigManager::new(DEFAULT_CONFIG_DIR)?;
    if !config_manager.settings_exist() {
        tracing::info!("First run: writing default settings");
        config_manager.save_settings(&UserSettings::default())?;
    }

    let metrics = Arc::new(Metrics::new());
    let result = runtime.block_on(run_console(&config_manager, Arc::clone(&metrics)));

    metrics.log_summary();
    tracing::info!("Goodbye!");
    result
}

/// Alternate between the settings menu and monitoring until the operator quits.
async fn run_console(config_manager: &ConfigManager, metrics: Arc<Metrics>) -> Result<()> {
    let mut probe = ConsoleProbe::install()?;
    let mut sink = TracingSink;
    let mut paused: Option<ChangeMonitor> = None;

    while let MenuOutcome::Start(config) = SettingsMenu::new(config_manager).run(&mut probe) {
        let session = match paused.take() {
            Some(mut monitor) => monitor.resume(config, &mut sink).map(|()| monitor),
            None => ChangeMonitor::new(config, &mut sink)
                .map(|monitor| monitor.with_metrics(Arc::clone(&metrics))),
        };

        let mut monitor = match session {
            Ok(monitor) => monitor,
            Err(e) => {
                tracing::error!("Cannot start monitoring: {}", e);
                continue;
            }
        };

        println!("Press Enter to pause and return to settings, type q or press Ctrl+C to exit.");

        match monitor.run(&mut probe, &mut sink).await {
            SessionExit::Paused => paused = Some(monitor),
            SessionExit::Terminated => return Ok(()),
        }
    }

    if let Some(mut monitor) = paused {
        monitor.terminate(&mut sink);
    }
    Ok(())
}
