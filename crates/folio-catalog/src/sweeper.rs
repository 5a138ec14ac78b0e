//! Background purge of books past the retention threshold.
//!
//! A sweep runs `Idle → Scanning → Deleting → Idle`:
//!
//! 1. **Scan** the backing store (never the cache, which may be stale).
//! 2. **Filter** records published before `today - retention_years`.
//! 3. **Delete** each through [`CatalogService::delete`], so cache
//!    invalidation is exactly the one manual deletes get.
//! 4. **Report** a [`SweepReport`]; zero deletions is a normal outcome.
//!
//! At most one sweep runs at a time. A trigger that arrives while a sweep is
//! in flight returns [`SweepOutcome::Skipped`]. Cancellation is observed
//! between records: an in-flight delete always completes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Months, NaiveDate, Utc};
use folio_store::{Book, BookId};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::CatalogService;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// Default retention threshold in years.
pub const DEFAULT_RETENTION_YEARS: u32 = 10;

/// Default time between scheduled sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the retention sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Records published more than this many years ago are purged.
    pub retention_years: u32,
    /// Time between scheduled sweeps.
    pub interval: Duration,
    /// Log what would be purged without deleting anything.
    pub dry_run: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            retention_years: DEFAULT_RETENTION_YEARS,
            interval: DEFAULT_SWEEP_INTERVAL,
            dry_run: false,
        }
    }
}

impl SweeperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention_years(mut self, years: u32) -> Self {
        self.retention_years = years;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Where the sweeper is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepState {
    Idle,
    Scanning,
    Deleting,
}

impl SweepState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SweepState::Scanning,
            2 => SweepState::Deleting,
            _ => SweepState::Idle,
        }
    }
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepState::Idle => write!(f, "idle"),
            SweepState::Scanning => write!(f, "scanning"),
            SweepState::Deleting => write!(f, "deleting"),
        }
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Records published before this date were eligible.
    pub cutoff: NaiveDate,
    /// Records read from the store.
    pub scanned: usize,
    /// Records older than the cutoff.
    pub expired: usize,
    /// Records this sweep deleted.
    pub deleted: usize,
    /// Expired records that were already gone when we tried to delete them.
    pub already_gone: usize,
    /// Expired records whose delete failed; retried on the next sweep.
    pub failed: usize,
    /// Whether the sweep stopped early on cancellation.
    pub cancelled: bool,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// IDs of deleted records.
    pub deleted_ids: Vec<BookId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SweepReport {
    fn new(cutoff: NaiveDate, started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            cutoff,
            scanned: 0,
            expired: 0,
            deleted: 0,
            already_gone: 0,
            failed: 0,
            cancelled: false,
            dry_run,
            deleted_ids: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }
}

/// What happened to a sweep trigger.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    /// The sweep ran to completion (or to cancellation).
    Completed(SweepReport),
    /// Another sweep was already in flight; this trigger did nothing.
    Skipped,
}

impl SweepOutcome {
    pub fn report(&self) -> Option<&SweepReport> {
        match self {
            SweepOutcome::Completed(report) => Some(report),
            SweepOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SweepOutcome::Skipped)
    }
}

/// Periodically purges records older than the retention threshold.
pub struct RetentionSweeper {
    catalog: Arc<CatalogService>,
    config: SweeperConfig,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
    state: AtomicU8,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicU64,
    skipped: AtomicU64,
}

/// Marks a sweep in flight; releases the claim on drop, including on error.
struct SweepGuard<'a> {
    sweeper: &'a RetentionSweeper,
}

impl<'a> SweepGuard<'a> {
    fn claim(sweeper: &'a RetentionSweeper) -> Option<Self> {
        sweeper
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let now_running = sweeper.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        sweeper.peak_in_flight.fetch_max(now_running, Ordering::SeqCst);
        Some(Self { sweeper })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.sweeper.set_state(SweepState::Idle);
        self.sweeper.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.sweeper.running.store(false, Ordering::Release);
    }
}

impl RetentionSweeper {
    /// Create a sweeper that reads the system clock.
    pub fn new(catalog: Arc<CatalogService>, config: SweeperConfig) -> Self {
        Self {
            catalog,
            config,
            clock: Arc::new(SystemClock),
            running: AtomicBool::new(false),
            state: AtomicU8::new(SweepState::Idle as u8),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Replace the clock (for tests and replays).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.catalog
    }

    /// Current state of the cycle.
    pub fn state(&self) -> SweepState {
        SweepState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of sweeps currently running (0 or 1).
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest `in_flight` ever observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Sweeps that ran (successfully or not).
    pub fn sweeps_completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Triggers dropped because a sweep was already running.
    pub fn skipped_triggers(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Records published strictly before this date are expired.
    pub fn cutoff(&self) -> NaiveDate {
        retention_cutoff(self.clock.today(), self.config.retention_years)
    }

    fn set_state(&self, state: SweepState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Run one sweep now, unless one is already running.
    pub async fn sweep_once(&self) -> Result<SweepOutcome> {
        self.sweep(&CancellationToken::new()).await
    }

    /// Run one sweep, stopping between records once `cancel` fires.
    ///
    /// Returns an error only if the scan itself failed. Per-record delete
    /// failures are counted in the report and do not abort the sweep.
    pub async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepOutcome> {
        let Some(_guard) = SweepGuard::claim(self) else {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            debug!("Sweep already in progress, trigger skipped");
            return Ok(SweepOutcome::Skipped);
        };

        let result = self.run_sweep(cancel).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result.map(SweepOutcome::Completed)
    }

    async fn run_sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        let cutoff = self.cutoff();
        let mut report = SweepReport::new(cutoff, self.clock.now(), self.config.dry_run);

        self.set_state(SweepState::Scanning);
        let books = match self.catalog.store_snapshot().await {
            Ok(books) => books,
            Err(e) => {
                warn!(error = %e, "Retention scan failed, sweep abandoned");
                return Err(e);
            }
        };
        report.scanned = books.len();

        let expired: Vec<Book> = books
            .into_iter()
            .filter(|book| book.published_date < cutoff)
            .collect();
        report.expired = expired.len();

        if !expired.is_empty() {
            self.set_state(SweepState::Deleting);
        }

        for (done, book) in expired.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                info!(
                    remaining = report.expired - done,
                    "Retention sweep cancelled"
                );
                break;
            }

            if self.config.dry_run {
                info!(
                    book_id = %book.id,
                    published = %book.published_date,
                    "Would purge expired book (dry run)"
                );
                continue;
            }

            match self.catalog.delete(&book.id).await {
                Ok(true) => {
                    debug!(book_id = %book.id, published = %book.published_date, "Purged expired book");
                    report.deleted += 1;
                    report.deleted_ids.push(book.id);
                }
                Ok(false) => {
                    debug!(book_id = %book.id, "Expired book already removed");
                    report.already_gone += 1;
                }
                Err(e) => {
                    warn!(
                        book_id = %book.id,
                        error = %e,
                        "Failed to purge expired book, continuing"
                    );
                    report.failed += 1;
                }
            }
        }

        report.finished_at = self.clock.now();

        if report.deleted > 0 {
            info!(
                deleted = report.deleted,
                scanned = report.scanned,
                failed = report.failed,
                cutoff = %cutoff,
                "Expired books purged"
            );
        } else if report.expired == 0 {
            info!(scanned = report.scanned, cutoff = %cutoff, "No expired books found");
        } else {
            info!(
                expired = report.expired,
                already_gone = report.already_gone,
                failed = report.failed,
                dry_run = report.dry_run,
                cancelled = report.cancelled,
                "Retention sweep finished without deletions"
            );
        }

        Ok(report)
    }

    /// Sweep on every tick of the configured interval until `cancel` fires.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep is
    /// running are dropped rather than queued.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs_f64(),
            retention_years = self.config.retention_years,
            dry_run = self.config.dry_run,
            "Retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep(&cancel).await {
                        Ok(SweepOutcome::Completed(_)) => {}
                        Ok(SweepOutcome::Skipped) => {
                            debug!("Scheduled sweep skipped, previous sweep still running");
                        }
                        Err(e) => warn!(error = %e, "Scheduled retention sweep failed"),
                    }
                }
            }
        }

        info!("Retention sweeper stopped");
    }

    /// Run [`RetentionSweeper::run`] on a background task.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> SweeperHandle {
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        SweeperHandle { cancel, task }
    }
}

impl fmt::Debug for RetentionSweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetentionSweeper")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("completed", &self.sweeps_completed())
            .finish_non_exhaustive()
    }
}

/// `today` minus `years` calendar years. Feb 29 maps to Feb 28.
pub fn retention_cutoff(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Handle to a spawned sweeper task.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Request a stop. The current record's delete still completes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Retention sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cutoff_subtracts_calendar_years() {
        assert_eq!(retention_cutoff(date(2024, 1, 1), 10), date(2014, 1, 1));
        assert_eq!(retention_cutoff(date(2024, 6, 15), 1), date(2023, 6, 15));
    }

    #[test]
    fn test_cutoff_on_leap_day() {
        assert_eq!(retention_cutoff(date(2024, 2, 29), 1), date(2023, 2, 28));
        assert_eq!(retention_cutoff(date(2024, 2, 29), 4), date(2020, 2, 29));
    }

    #[test]
    fn test_cutoff_saturates() {
        assert_eq!(retention_cutoff(date(2024, 1, 1), u32::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [SweepState::Idle, SweepState::Scanning, SweepState::Deleting] {
            assert_eq!(SweepState::from_u8(state as u8), state);
        }
        assert_eq!(SweepState::Deleting.to_string(), "deleting");
    }

    #[test]
    fn test_config_builder() {
        let config = SweeperConfig::new()
            .with_retention_years(3)
            .with_interval(Duration::from_secs(5))
            .with_dry_run(true);
        assert_eq!(config.retention_years, 3);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.dry_run);

        let default = SweeperConfig::default();
        assert_eq!(default.retention_years, DEFAULT_RETENTION_YEARS);
        assert_eq!(default.interval, Duration::from_secs(30));
    }
}
