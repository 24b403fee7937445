//! Rooms and seat assignment for boxoffice.
//!
//! The rooms live in one authoritative table. Exactly one actor, the
//! dispatcher, assigns seats; the room schedulers only read occupancy and
//! clear a room at the end of a screening.
//!
//! # Key types
//!
//! - [`RoomSpec`]: static room configuration (capacity, film, minimum age)
//! - [`Room`]: one room and its seated clients
//! - [`RoomTable`]: every room, plus the one-seat-per-client index
//! - [`SharedRooms`]: the table behind a read/write lock
//! - [`Dispatcher`]: the actor that turns requests into replies

mod dispatcher;
mod error;
mod room;
mod table;

pub use dispatcher::{spawn_dispatcher, Dispatcher, DispatcherStats};
pub use error::RoomError;
pub use room::{Room, RoomInfo, RoomSpec};
pub use table::{Reservation, RoomTable, SharedRooms};
