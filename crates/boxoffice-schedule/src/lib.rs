//! Screening schedules for boxoffice.
//!
//! Every room cycles IDLE → SCREENING → IDLE forever:
//!
//! ```text
//!        idle elapsed: Start to seated clients
//!   IDLE ─────────────────────────────────▶ SCREENING
//!    ▲                                         │
//!    └─────────────────────────────────────────┘
//!        screening elapsed: drain room, End to drained clients
//! ```
//!
//! - [`ScreeningClock`] times the phases, with a random delay on the first
//!   one.
//! - [`RoomScheduler`] is the per-room actor that turns phase changes into
//!   notifications, reading occupancy from the shared room table each time.

mod clock;
mod scheduler;

pub use clock::{millis, Phase, PhaseChange, ScheduleConfig, ScreeningClock};
pub use scheduler::{spawn_scheduler, RoomScheduler, SchedulerMetrics};
