//! Wire protocol for boxoffice.
//!
//! This crate defines what cinema actors say to each other:
//!
//! - **Types** ([`ReservationRequest`], [`ReservationReply`],
//!   [`ScreeningEvent`], [`Notification`], ids): the values that travel
//!   between actors.
//! - **Codec** ([`WireValue`]): the integer encoding used by the
//!   notification lanes.
//! - **Errors** ([`ProtocolError`]): what can go wrong at the wire
//!   boundary.
//!
//! The protocol layer knows nothing about channels, rooms or clients;
//! it only knows how values look on the wire.
//!
//! ```text
//! Client ──RequestRecord──▶ Dispatcher
//! Dispatcher / Scheduler ──NotificationPayload──▶ Client
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    WireValue, EVENT_END, EVENT_START, FIELD_BITS, FIELD_MASK,
    REPLY_AGE_RESTRICTED, REPLY_NO_SUCH_FILM, REPLY_ROOM_FULL,
};
pub use error::ProtocolError;
pub use types::{
    ClientId, FilmId, Notification, NotificationKind, NotificationPayload,
    RequestRecord, ReservationReply, ReservationRequest, RoomId,
    ScreeningEvent, ScreeningKind, REQUEST_KIND,
};
