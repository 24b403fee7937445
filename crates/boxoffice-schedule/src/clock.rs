//! The screening clock: an IDLE ⇄ SCREENING phase timer for one room.

use std::time::Duration;

use boxoffice_protocol::ScreeningKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Phase durations for a room's screening cycle.
///
/// Serialized as integer milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// How long the room stays open for reservations between screenings.
    #[serde(rename = "idle_ms", with = "millis")]
    pub idle: Duration,

    /// How long one screening lasts.
    #[serde(rename = "screening_ms", with = "millis")]
    pub screening: Duration,

    /// Upper bound of the random delay added to the *first* idle phase so
    /// rooms started together do not screen in lockstep. Zero disables it.
    #[serde(rename = "initial_jitter_ms", with = "millis")]
    pub initial_jitter: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(20),
            screening: Duration::from_secs(30),
            initial_jitter: Duration::from_secs(2),
        }
    }
}

impl ScheduleConfig {
    /// Shorthand for a config without jitter.
    pub fn new(idle: Duration, screening: Duration) -> Self {
        Self {
            idle,
            screening,
            initial_jitter: Duration::ZERO,
        }
    }

    /// Length of one full IDLE + SCREENING cycle.
    pub fn cycle(&self) -> Duration {
        self.idle + self.screening
    }
}

/// `Duration` as integer milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Screening,
}

impl Phase {
    /// The event announcing entry into this phase. Entering `Idle` ends a
    /// screening.
    pub fn entry_event(self) -> ScreeningKind {
        match self {
            Self::Idle => ScreeningKind::End,
            Self::Screening => ScreeningKind::Start,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Idle => Self::Screening,
            Self::Screening => Self::Idle,
        }
    }
}

/// Returned by [`ScreeningClock::wait_for_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// The phase just entered.
    pub phase: Phase,
    /// Screening number, starting at 1. An `End` carries the number of the
    /// screening it ends.
    pub cycle: u64,
    /// How late the timer woke up.
    pub late_by: Duration,
}

impl PhaseChange {
    /// The screening event to broadcast for this change.
    pub fn event(&self) -> ScreeningKind {
        self.phase.entry_event()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Drives one room's IDLE/SCREENING cycle.
///
/// Starts in [`Phase::Idle`]. Built to sit in an actor's `tokio::select!`
/// loop next to a shutdown branch:
///
/// ```ignore
/// loop {
///     tokio::select! {
///         _ = shutdown.wait() => break,
///         change = clock.wait_for_change() => { /* notify seated clients */ }
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ScreeningClock {
    config: ScheduleConfig,
    phase: Phase,
    cycle: u64,
    /// When the current phase ends.
    deadline: Instant,
}

impl ScreeningClock {
    /// Creates a clock in `Idle`. The first phase is lengthened by a random
    /// jitter in `0..initial_jitter`.
    pub fn new(config: ScheduleConfig) -> Self {
        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = config.initial_jitter.as_millis().try_into().unwrap_or(u64::MAX);
            Duration::from_millis(rand::rng().random_range(0..max))
        };

        debug!(
            idle_ms = config.idle.as_millis() as u64,
            screening_ms = config.screening.as_millis() as u64,
            jitter_ms = jitter.as_millis() as u64,
            "screening clock created"
        );

        Self {
            config,
            phase: Phase::Idle,
            cycle: 0,
            deadline: Instant::now() + config.idle + jitter,
        }
    }

    /// Sleeps until the current phase ends, moves to the next one and
    /// reports the change.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the clock
    /// unchanged.
    pub async fn wait_for_change(&mut self) -> PhaseChange {
        time::sleep_until(self.deadline).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.deadline);
        self.phase = self.phase.next();

        match self.phase {
            Phase::Screening => {
                self.cycle += 1;
                self.deadline = now + self.config.screening;
            }
            Phase::Idle => self.deadline = now + self.config.idle,
        }

        trace!(phase = ?self.phase, cycle = self.cycle, "phase changed");

        PhaseChange {
            phase: self.phase,
            cycle: self.cycle,
            late_by,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Screenings started so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
