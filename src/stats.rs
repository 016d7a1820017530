//! Invocation outcome counters.
//!
//! Five counters, one per terminal decision the retry layer can take:
//!
//! | Counter | Symbol | Incremented when |
//! |---------|--------|------------------|
//! | `SUCCESS` | `.` | An attempt completed with usable content |
//! | `FAILURE` | `!` | The retry layer gave up on a request |
//! | `STEPUP`  | `^` | The request escalated to a larger-context model |
//! | `RETRY`   | `r` | An attempt was retried as-is |
//! | `CROP`    | `~` | The prompt was shrunk before a retry |
//!
//! Counters are atomic; concurrent increments are never lost, and no
//! ordering beyond the final counts is guaranteed. Construct one tracker
//! at process start and pass the handle to whoever records events.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

// ============================================================================
// Events
// ============================================================================

/// A terminal decision worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatEvent {
    /// Usable content delivered.
    Success,
    /// Gave up.
    Failure,
    /// Escalated to a larger-context model.
    StepUp,
    /// Retried the same request.
    Retry,
    /// Shrunk the prompt before retrying.
    Crop,
}

impl StatEvent {
    /// All events, in display order.
    pub const ALL: [StatEvent; 5] = [
        StatEvent::Success,
        StatEvent::Failure,
        StatEvent::StepUp,
        StatEvent::Retry,
        StatEvent::Crop,
    ];

    /// Counter name.
    pub fn name(&self) -> &'static str {
        match self {
            StatEvent::Success => "SUCCESS",
            StatEvent::Failure => "FAILURE",
            StatEvent::StepUp => "STEPUP",
            StatEvent::Retry => "RETRY",
            StatEvent::Crop => "CROP",
        }
    }

    /// One-character progress symbol.
    pub fn symbol(&self) -> char {
        match self {
            StatEvent::Success => '.',
            StatEvent::Failure => '!',
            StatEvent::StepUp => '^',
            StatEvent::Retry => 'r',
            StatEvent::Crop => '~',
        }
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Process-scoped invocation counters.
#[derive(Debug, Default)]
pub struct InvocationStats {
    success: AtomicU64,
    failure: AtomicU64,
    step_up: AtomicU64,
    retry: AtomicU64,
    crop: AtomicU64,
    echo: bool,
}

impl InvocationStats {
    /// Create a tracker with progress echo disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that writes each event's symbol to stderr for
    /// live progress feedback.
    pub fn with_echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    fn counter(&self, event: StatEvent) -> &AtomicU64 {
        match event {
            StatEvent::Success => &self.success,
            StatEvent::Failure => &self.failure,
            StatEvent::StepUp => &self.step_up,
            StatEvent::Retry => &self.retry,
            StatEvent::Crop => &self.crop,
        }
    }

    /// Record one event.
    pub fn record(&self, event: StatEvent) {
        self.counter(event).fetch_add(1, Ordering::Relaxed);
        trace!(event = event.name(), "recorded invocation event");
        if self.echo {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "{}", event.symbol());
            let _ = stderr.flush();
        }
    }

    /// Current count for one event.
    pub fn count(&self, event: StatEvent) -> u64 {
        self.counter(event).load(Ordering::Relaxed)
    }

    /// An independent copy of all counters; mutating it never affects
    /// the live tracker. With `include_total`, a derived `TOTAL` entry
    /// (`SUCCESS + FAILURE`) is added.
    pub fn snapshot(&self, include_total: bool) -> StatsSnapshot {
        let mut counts = BTreeMap::new();
        for event in StatEvent::ALL {
            counts.insert(event.name().to_string(), self.count(event));
        }
        if include_total {
            counts.insert(
                "TOTAL".to_string(),
                self.count(StatEvent::Success) + self.count(StatEvent::Failure),
            );
        }
        StatsSnapshot { counts }
    }
}

/// A detached copy of the counters at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Counter name to count. Owned by the snapshot.
    pub counts: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    /// Count for a named counter, zero if absent.
    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, count) in &self.counts {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{name}={count}")?;
            first = false;
        }
        Ok(())
    }
}
