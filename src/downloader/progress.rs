//! Progress tracking for batch runs.
//!
//! Workers report each finished date; the tracker decides when a progress
//! line is due (every 10% or once per update interval) and formats it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PERCENTAGE_STEP: f64 = 10.0;

/// Progress state for one batch.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Dates processed so far, complete or not.
    pub dates_done: u64,
    /// Dates whose three files were all saved.
    pub dates_complete: u64,
    /// Dates in the batch.
    pub total_dates: u64,
    /// Timestamp when the batch started.
    pub start_time: Instant,
    /// Last time progress was reported.
    pub last_update: Instant,
    /// Minimum interval between progress updates.
    pub update_interval: Duration,
    /// Last reported completion percentage (0-100).
    pub last_reported_percentage: f64,
    /// Minimum percentage delta required to emit a new update.
    pub min_percentage_step: f64,
}

impl ProgressState {
    /// Create a state for a batch of `total_dates` with default cadence.
    pub fn new(total_dates: u64) -> Self {
        let now = Instant::now();
        Self {
            dates_done: 0,
            dates_complete: 0,
            total_dates,
            start_time: now,
            last_update: now,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_reported_percentage: 0.0,
            min_percentage_step: DEFAULT_PERCENTAGE_STEP,
        }
    }

    /// Count one processed date.
    pub fn update(&mut self, fully_successful: bool) {
        self.dates_done = self.dates_done.saturating_add(1);
        if fully_successful {
            self.dates_complete = self.dates_complete.saturating_add(1);
        }
    }

    /// Whether a progress update should be emitted based on time or percentage.
    pub fn should_emit_update(&self) -> bool {
        if self.dates_done == 0 {
            return false;
        }
        if self.dates_done == self.total_dates {
            return true;
        }
        if self.percentage() - self.last_reported_percentage >= self.min_percentage_step {
            return true;
        }
        self.last_update.elapsed() >= self.update_interval
    }

    /// Call after emitting a progress log to reset timers and cached percentage.
    pub fn mark_emitted(&mut self) {
        self.last_update = Instant::now();
        self.last_reported_percentage = self.percentage();
    }

    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total_dates == 0 {
            return 100.0;
        }
        (self.dates_done as f64 / self.total_dates as f64) * 100.0
    }

    /// Estimate remaining time from the average time per processed date.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        if self.dates_done == 0 {
            return None;
        }
        let remaining = self.total_dates.saturating_sub(self.dates_done);
        if remaining == 0 {
            return None;
        }
        let per_date = self.start_time.elapsed().as_secs_f64() / self.dates_done as f64;
        Some(Duration::from_secs_f64(per_date * remaining as f64))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] {}/{} dates - {:.1}% complete",
            self.dates_done,
            self.total_dates,
            self.percentage()
        )];

        let incomplete = self.dates_done - self.dates_complete;
        if incomplete > 0 {
            parts.push(format!("({incomplete} incomplete)"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

/// Progress shared between the workers of one batch.
#[derive(Debug)]
pub struct BatchProgress {
    state: Mutex<ProgressState>,
}

impl BatchProgress {
    /// Tracker for a batch of `total_dates`.
    pub fn new(total_dates: usize) -> Self {
        Self {
            state: Mutex::new(ProgressState::new(total_dates as u64)),
        }
    }

    /// Record a finished date; returns a progress line when one is due.
    pub fn record(&self, fully_successful: bool) -> Option<String> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.update(fully_successful);
        if state.should_emit_update() {
            state.mark_emitted();
            Some(state.format_progress())
        } else {
            None
        }
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> ProgressState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
