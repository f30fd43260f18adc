use camino::Utf8PathBuf;

/// Why a change check did not produce a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source's modification time matches the last one seen.
    Unchanged,
}

/// Events emitted by the monitor
///
/// The monitor has no opinion on how these are rendered; an [`EventSink`]
/// decides. [`TracingSink`] logs them.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Watching began with a fresh configuration
    SessionStarted {
        source: Utf8PathBuf,
        backup_dir: Utf8PathBuf,
        interval_secs: u64,
    },

    /// Watching resumed after a pause
    Resumed {
        source: Utf8PathBuf,
        backup_dir: Utf8PathBuf,
        interval_secs: u64,
    },

    /// Periodic liveness signal on change-check ticks
    Heartbeat { tick: u64 },

    BackupCreated { filename: String },

    BackupSkipped { reason: SkipReason },

    BackupPruned { filename: String, year: i32 },

    PruneFailed { filename: String },

    /// The source had no readable modification time at a change check
    SourceMissing,

    CopyFailed { error: String },

    Paused,

    Terminated,
}

/// Receives monitor events.
pub trait EventSink {
    fn emit(&mut self, event: MonitorEvent);
}

/// Collects events in order; handy for callers that inspect them afterwards.
impl EventSink for Vec<MonitorEvent> {
    fn emit(&mut self, event: MonitorEvent) {
        self.push(event);
    }
}

/// Renders events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::SessionStarted {
                source,
                backup_dir,
                interval_secs,
            } => {
                tracing::info!("Monitoring autosave for changes every {}s", interval_secs);
                tracing::info!("Source: {}", source);
                tracing::info!("Backups: {}", backup_dir);
            }
            MonitorEvent::Resumed {
                source,
                backup_dir,
                interval_secs,
            } => {
                tracing::info!("Resumed monitoring every {}s", interval_secs);
                tracing::info!("Source: {}", source);
                tracing::info!("Backups: {}", backup_dir);
            }
            MonitorEvent::Heartbeat { tick } => {
                tracing::info!(tick, "Watching for file changes...");
            }
            MonitorEvent::BackupCreated { filename } => {
                tracing::info!("Backup created: {}", filename);
            }
            MonitorEvent::BackupSkipped { reason } => {
                tracing::debug!("No backup needed: {:?}", reason);
            }
            MonitorEvent::BackupPruned { filename, year } => {
                tracing::info!("Cleaned up old backup: {} (Year {})", filename, year);
            }
            MonitorEvent::PruneFailed { filename } => {
                tracing::warn!("Could not remove old backup: {}", filename);
            }
            MonitorEvent::SourceMissing => {
                tracing::debug!("Source save not found, will check again");
            }
            MonitorEvent::CopyFailed { error } => {
                tracing::error!("Backup failed: {}", error);
            }
            MonitorEvent::Paused => {
                tracing::info!("Monitoring paused");
            }
            MonitorEvent::Terminated => {
                tracing::info!("Monitoring stopped");
            }
        }
    }
}
