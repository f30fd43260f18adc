// EU4 Autobackup - Timestamped backups of the EU4 multiplayer autosave
//
// This is the library crate containing the monitoring and retention engine.
// The binary crate (main.rs) wires the settings menu to the monitor.

pub mod config;
pub mod console;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{ConfigError, Configuration, Retention, UserSettings};
pub use monitor::{ChangeMonitor, EventSink, MonitorEvent, SessionExit};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
