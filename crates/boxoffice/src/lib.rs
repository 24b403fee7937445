//! # boxoffice
//!
//! A multi-room cinema whose actors negotiate seat reservations and
//! screening times purely by message passing.
//!
//! Clients submit requests on one shared channel; a single dispatcher owns
//! every seat decision; one scheduler per room announces screenings to
//! whoever is seated when each phase changes. All of them are Tokio tasks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boxoffice::prelude::*;
//!
//! # async fn demo() -> Result<(), BoxOfficeError> {
//! let config = CinemaConfig::load("cinema.json")?;
//! let cinema = Cinema::builder().config(config).start().await?;
//! tokio::signal::ctrl_c().await.ok();
//! cinema.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod cinema;
mod client;
mod config;
mod error;
mod log_sink;
mod teardown;

pub use cinema::{Cinema, CinemaBuilder, CinemaReport};
pub use client::{ClientActor, ClientStats};
pub use config::{CinemaConfig, ClientConfig};
pub use error::{BoxOfficeError, ClientError, ConfigError};
pub use log_sink::{LogSink, LogWriter};
pub use teardown::Teardown;

/// Common imports for running a simulation.
pub mod prelude {
    pub use crate::{
        BoxOfficeError, Cinema, CinemaConfig, CinemaReport, ClientConfig, LogSink, Teardown,
    };
    pub use boxoffice_protocol::{ClientId, FilmId, ReservationReply, RoomId, ScreeningKind};
    pub use boxoffice_registry::{ClientProfile, ClientStatus};
    pub use boxoffice_room::RoomSpec;
    pub use boxoffice_schedule::ScheduleConfig;
}
