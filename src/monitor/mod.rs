//! The polling loop that watches the autosave and drives backups.
//!
//! # Overview
//!
//! [`ChangeMonitor`] runs one monitoring session at a time:
//!
//! 1. Every tick (one second by default) it consults the [`CancellationProbe`]
//! 2. Every `poll_interval_secs` ticks it performs a change check: the source's
//!    modification time is compared with the last one seen
//! 3. On a change it extracts the player tag, writes a backup, re-reads the
//!    in-game year from the source and prunes old backups
//!
//! The modification time is the only trigger; file contents are never hashed.
//! Everything runs on the loop's own task, so a slow copy delays the next tick.
//!
//! # Lifecycle
//!
//! ```text
//! Watching ──pause──▶ PausedForMenu ──resume(config)──▶ Watching
//!    │                      │
//!    └──────terminate───────┴──────▶ Terminated
//! ```

pub mod events;
pub mod probe;
pub mod state;

pub use events::{EventSink, MonitorEvent, SkipReason, TracingSink};
pub use probe::{CancellationProbe, ConsoleProbe, ProbeSignal, interpret_line};
pub use state::{MonitorPhase, MonitorState, modification_time};

use crate::metrics::Metrics;
use crate::models::{ConfigError, Configuration};
use crate::services::{BackupWriter, MetadataExtractor, PruneReport, RetentionManager};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Length of one tick.
pub const TICK_QUANTUM: Duration = Duration::from_secs(1);

/// A heartbeat event is emitted on change checks whose tick is a multiple of this.
pub const HEARTBEAT_EVERY_TICKS: u64 = 10;

/// Errors that keep a session from entering `Watching`
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Failed to create backup directory {path}: {error}")]
    BackupDirUnavailable {
        path: Utf8PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Cannot resume monitoring while {0:?}")]
    NotPaused(MonitorPhase),
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not a change-check tick, or the monitor is not watching.
    Idle,
    Unchanged,
    SourceMissing,
    BackedUp { backup: Utf8PathBuf, pruned: usize },
    CopyFailed,
}

/// Why [`ChangeMonitor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Paused,
    Terminated,
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Watches one save file and keeps timestamped, year-pruned backups of it.
pub struct ChangeMonitor {
    config: Configuration,
    state: MonitorState,
    phase: MonitorPhase,
    quantum: Duration,
    extractor: MetadataExtractor,
    writer: BackupWriter,
    retention: RetentionManager,
    metrics: Arc<Metrics>,
    clock: Clock,
}

impl ChangeMonitor {
    /// Start a session in `Watching`.
    ///
    /// The configuration is re-validated; a self-referential or unset path is
    /// refused. The backup directory is created if missing, and the source's
    /// current modification time becomes the baseline.
    pub fn new(config: Configuration, sink: &mut dyn EventSink) -> Result<Self, MonitorError> {
        config.validate()?;
        prepare_backup_dir(config.backup_dir())?;

        let state = MonitorState::new(modification_time(config.source()));
        sink.emit(MonitorEvent::SessionStarted {
            source: config.source().to_path_buf(),
            backup_dir: config.backup_dir().to_path_buf(),
            interval_secs: config.poll_interval_secs(),
        });

        Ok(Self {
            config,
            state,
            phase: MonitorPhase::Watching,
            quantum: TICK_QUANTUM,
            extractor: MetadataExtractor::new(),
            writer: BackupWriter::new(),
            retention: RetentionManager::new(),
            metrics: Arc::new(Metrics::new()),
            clock: Box::new(|| chrono::Local::now().naive_local()),
        })
    }

    /// Record into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the tick length.
    pub fn with_quantum(mut self, quantum: Duration) -> Self {
        self.quantum = quantum;
        self
    }

    /// Override the wall clock used for backup names.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Run ticks until the probe pauses or terminates the session.
    ///
    /// Each iteration sleeps one quantum, polls the probe, then ticks. A probe
    /// signal is only acted on at this boundary, never mid-check.
    pub async fn run(
        &mut self,
        probe: &mut dyn CancellationProbe,
        sink: &mut dyn EventSink,
    ) -> SessionExit {
        loop {
            match self.phase {
                MonitorPhase::Watching => {}
                MonitorPhase::PausedForMenu => return SessionExit::Paused,
                MonitorPhase::Terminated => return SessionExit::Terminated,
            }

            tokio::time::sleep(self.quantum).await;

            match probe.poll() {
                Some(ProbeSignal::Pause) => self.pause(sink),
                Some(ProbeSignal::Terminate) => self.terminate(sink),
                None => {
                    self.tick(sink);
                }
            }
        }
    }

    /// Advance one tick without sleeping, running a change check when due.
    pub fn tick(&mut self, sink: &mut dyn EventSink) -> TickOutcome {
        if self.phase != MonitorPhase::Watching {
            return TickOutcome::Idle;
        }

        let tick = self.state.advance();
        if !self.state.is_check_due(self.config.poll_interval_secs()) {
            return TickOutcome::Idle;
        }

        if tick % HEARTBEAT_EVERY_TICKS == 0 {
            sink.emit(MonitorEvent::Heartbeat { tick });
        }

        self.check_for_change(sink)
    }

    /// Compare the source's modification time with the last one seen and back
    /// it up if it changed.
    ///
    /// A failed copy leaves the baseline untouched so the next check retries.
    pub fn check_for_change(&mut self, sink: &mut dyn EventSink) -> TickOutcome {
        self.metrics.record_check();

        let source = self.config.source();
        let backup_dir = self.config.backup_dir();

        let Some(current_mtime) = modification_time(source) else {
            sink.emit(MonitorEvent::SourceMissing);
            return TickOutcome::SourceMissing;
        };

        if self.state.last_known_mtime == Some(current_mtime) {
            sink.emit(MonitorEvent::BackupSkipped {
                reason: SkipReason::Unchanged,
            });
            return TickOutcome::Unchanged;
        }

        let metadata = self.extractor.extract(source);
        let now = (self.clock)();
        let backup = match self
            .writer
            .write(source, backup_dir, metadata.tag_or_unknown(), now)
        {
            Ok(backup) => backup,
            Err(e) => {
                self.metrics.record_copy_failure();
                sink.emit(MonitorEvent::CopyFailed {
                    error: e.to_string(),
                });
                return TickOutcome::CopyFailed;
            }
        };

        self.metrics.record_backup_created();
        sink.emit(MonitorEvent::BackupCreated {
            filename: backup.file_name().unwrap_or(backup.as_str()).to_string(),
        });

        let mut pruned = 0;
        if let Some(current_year) = self.extractor.extract(source).in_game_year {
            let report = self
                .retention
                .prune(backup_dir, current_year, self.config.retention());
            pruned = self.report_prune(report, sink);
        }

        self.state.last_known_mtime = Some(current_mtime);
        TickOutcome::BackedUp { backup, pruned }
    }

    /// Turn a prune pass into events and metrics. Returns the number pruned.
    fn report_prune(&self, report: PruneReport, sink: &mut dyn EventSink) -> usize {
        self.metrics.record_prune(report.pruned.len(), report.failed.len());
        let pruned = report.pruned.len();

        for entry in report.pruned {
            sink.emit(MonitorEvent::BackupPruned {
                filename: entry.filename,
                year: entry.year,
            });
        }
        for filename in report.failed {
            sink.emit(MonitorEvent::PruneFailed { filename });
        }
        pruned
    }

    /// Leave `Watching` for the menu.
    pub fn pause(&mut self, sink: &mut dyn EventSink) {
        if self.transition(MonitorPhase::PausedForMenu) {
            self.metrics.record_pause();
            sink.emit(MonitorEvent::Paused);
        }
    }

    /// Return to `Watching` with a new configuration and fresh state.
    pub fn resume(
        &mut self,
        config: Configuration,
        sink: &mut dyn EventSink,
    ) -> Result<(), MonitorError> {
        if self.phase != MonitorPhase::PausedForMenu {
            return Err(MonitorError::NotPaused(self.phase));
        }
        config.validate()?;
        prepare_backup_dir(config.backup_dir())?;

        self.state = MonitorState::new(modification_time(config.source()));
        self.config = config;
        self.transition(MonitorPhase::Watching);

        sink.emit(MonitorEvent::Resumed {
            source: self.config.source().to_path_buf(),
            backup_dir: self.config.backup_dir().to_path_buf(),
            interval_secs: self.config.poll_interval_secs(),
        });
        Ok(())
    }

    /// Stop for good. No further ticks run.
    pub fn terminate(&mut self, sink: &mut dyn EventSink) {
        if self.transition(MonitorPhase::Terminated) {
            sink.emit(MonitorEvent::Terminated);
        }
    }

    fn transition(&mut self, next: MonitorPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Ignoring transition {:?} -> {:?}", self.phase, next);
            return false;
        }
        tracing::debug!("Monitor {:?} -> {:?}", self.phase, next);
        self.phase = next;
        true
    }
}

fn prepare_backup_dir(backup_dir: &Utf8Path) -> Result<(), MonitorError> {
    if backup_dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(backup_dir).map_err(|error| MonitorError::BackupDirUnavailable {
        path: backup_dir.to_path_buf(),
        error,
    })?;
    tracing::info!("Created backup directory {}", backup_dir);
    Ok(())
}
