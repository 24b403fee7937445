//! Error types for the room layer.

use boxoffice_protocol::{ClientId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No free seat is left.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The client already holds a seat in this room.
    #[error("client {0} already seated in room {1}")]
    AlreadySeated(ClientId, RoomId),

    /// Two room specs share an id.
    #[error("room {0} is configured twice")]
    DuplicateRoom(RoomId),

    /// The room id does not fit the 16-bit field of a screening payload.
    #[error("room id {0} does not fit the notification payload")]
    RoomIdOutOfRange(RoomId),

    /// A table-wide invariant no longer holds. Always a bug.
    #[error("room invariant violated: {0}")]
    InvariantViolated(String),
}
