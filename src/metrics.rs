// Session metrics module
//
// Lightweight counters for what the monitor did while the process was running

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide backup metrics
///
/// Uses atomic operations so the console and the monitor can share one
/// instance behind an `Arc` without locks. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Change checks performed (one per poll interval)
    pub checks: AtomicU64,

    /// Backups successfully written
    pub backups_created: AtomicU64,

    /// Backup copies that failed
    pub copy_failures: AtomicU64,

    /// Old backups deleted by retention
    pub backups_pruned: AtomicU64,

    /// Old backups that could not be deleted
    pub prune_failures: AtomicU64,

    /// Times monitoring was paused for the menu
    pub pauses: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            checks: AtomicU64::new(0),
            backups_created: AtomicU64::new(0),
            copy_failures: AtomicU64::new(0),
            backups_pruned: AtomicU64::new(0),
            prune_failures: AtomicU64::new(0),
            pauses: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_check(&self) {
        self.checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backup_created(&self) {
        self.backups_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copy_failure(&self) {
        self.copy_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one prune pass
    pub fn record_prune(&self, pruned: usize, failed: usize) {
        self.backups_pruned.fetch_add(pruned as u64, Ordering::Relaxed);
        self.prune_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Backup Session Summary ===");
        tracing::info!("Uptime: {:.0}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Checks: {}, pauses: {}",
            self.checks.load(Ordering::Relaxed),
            self.pauses.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Backups: {} created, {} failed",
            self.backups_created.load(Ordering::Relaxed),
            self.copy_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Retention: {} pruned, {} could not be removed",
            self.backups_pruned.load(Ordering::Relaxed),
            self.prune_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
