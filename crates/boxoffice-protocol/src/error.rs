//! Error types for the protocol layer.
//!
//! Each crate in boxoffice defines its own error enum. A `ProtocolError`
//! always means a value could not be represented on, or recovered from,
//! the wire. Business outcomes such as a full room are never errors; they
//! are [`ReservationReply`](crate::ReservationReply) variants.

use crate::RoomId;

/// Errors that can occur while encoding or decoding wire values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The room id does not fit the 16-bit payload field.
    #[error("room id {0} does not fit the 16-bit payload field")]
    RoomIdOutOfRange(RoomId),

    /// The screening payload carried an event kind other than start/end.
    #[error("unknown screening event kind {0}")]
    UnknownEventKind(i32),

    /// The payload value is not legal on its lane.
    #[error("invalid payload value {0}")]
    InvalidPayload(i32),

    /// A record on the request channel carried a foreign `kind` tag.
    #[error("unexpected record kind {0}")]
    UnexpectedRecordKind(u32),
}
