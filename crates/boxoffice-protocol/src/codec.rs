//! Integer codec for notification payloads.
//!
//! Notifications travel as a single `i32`, so the two lanes use two layouts:
//!
//! ```text
//! Screening:  value = (event_kind << 16) | (room_id & 0xFFFF)
//!             event_kind: 1 = start, 2 = end
//! Reply:      value = room_id            (accepted)
//!             value = -999               (age restricted)
//!             value = -888               (room full)
//!             value = -777               (no such film)
//! ```
//!
//! The reply sentinels are negative and therefore outside the legal room-id
//! range `0..=0xFFFF`, so no room id can ever be mistaken for a rejection.

use crate::{
    Notification, NotificationKind, NotificationPayload, ProtocolError,
    ReservationReply, RoomId, ScreeningEvent, ScreeningKind,
};

/// Width of each field packed into a screening payload.
pub const FIELD_BITS: u32 = 16;

/// Mask selecting one packed field.
pub const FIELD_MASK: i32 = 0xFFFF;

/// Wire value of [`ScreeningKind::Start`].
pub const EVENT_START: i32 = 1;

/// Wire value of [`ScreeningKind::End`].
pub const EVENT_END: i32 = 2;

/// Reply sentinel: requester is under the room's minimum age.
pub const REPLY_AGE_RESTRICTED: i32 = -999;

/// Reply sentinel: the room is full.
pub const REPLY_ROOM_FULL: i32 = -888;

/// Reply sentinel: no room shows the requested film.
pub const REPLY_NO_SUCH_FILM: i32 = -777;

/// A value that can be converted to and from its integer wire form.
///
/// Encoding is fallible so that values which cannot be represented (a room
/// id wider than 16 bits) are refused instead of silently truncated.
pub trait WireValue: Sized {
    /// Converts the value into its wire integer.
    fn to_wire(&self) -> Result<i32, ProtocolError>;

    /// Parses a wire integer back into a value.
    fn from_wire(value: i32) -> Result<Self, ProtocolError>;
}

impl WireValue for ScreeningEvent {
    fn to_wire(&self) -> Result<i32, ProtocolError> {
        if !self.room_id.fits_wire() {
            return Err(ProtocolError::RoomIdOutOfRange(self.room_id));
        }
        let kind = match self.kind {
            ScreeningKind::Start => EVENT_START,
            ScreeningKind::End => EVENT_END,
        };
        // Checked above: the room id is at most 0xFFFF, so the cast is lossless.
        let room = self.room_id.0 as i32;
        Ok((kind << FIELD_BITS) | (room & FIELD_MASK))
    }

    fn from_wire(value: i32) -> Result<Self, ProtocolError> {
        if value < 0 {
            return Err(ProtocolError::InvalidPayload(value));
        }
        let kind = match (value >> FIELD_BITS) & FIELD_MASK {
            EVENT_START => ScreeningKind::Start,
            EVENT_END => ScreeningKind::End,
            other => return Err(ProtocolError::UnknownEventKind(other)),
        };
        let room_id = RoomId((value & FIELD_MASK) as u32);
        Ok(Self { kind, room_id })
    }
}

impl WireValue for ReservationReply {
    fn to_wire(&self) -> Result<i32, ProtocolError> {
        match self {
            Self::Accepted(room_id) => {
                if !room_id.fits_wire() {
                    return Err(ProtocolError::RoomIdOutOfRange(*room_id));
                }
                Ok(room_id.0 as i32)
            }
            Self::RejectedAgeRestricted => Ok(REPLY_AGE_RESTRICTED),
            Self::RejectedRoomFull => Ok(REPLY_ROOM_FULL),
            Self::RejectedNoSuchFilm => Ok(REPLY_NO_SUCH_FILM),
        }
    }

    fn from_wire(value: i32) -> Result<Self, ProtocolError> {
        match value {
            REPLY_AGE_RESTRICTED => Ok(Self::RejectedAgeRestricted),
            REPLY_ROOM_FULL => Ok(Self::RejectedRoomFull),
            REPLY_NO_SUCH_FILM => Ok(Self::RejectedNoSuchFilm),
            v if (0..=RoomId::MAX_WIRE as i32).contains(&v) => {
                Ok(Self::Accepted(RoomId(v as u32)))
            }
            v => Err(ProtocolError::InvalidPayload(v)),
        }
    }
}

impl Notification {
    /// Encodes the notification into the payload delivered to an inbox.
    pub fn encode(&self) -> Result<NotificationPayload, ProtocolError> {
        match self {
            Self::Reply(reply) => Ok(NotificationPayload {
                kind: NotificationKind::Reply,
                value: reply.to_wire()?,
            }),
            Self::Screening(event) => Ok(NotificationPayload {
                kind: NotificationKind::Screening,
                value: event.to_wire()?,
            }),
        }
    }
}

impl NotificationPayload {
    /// Decodes the payload according to its lane.
    pub fn decode(self) -> Result<Notification, ProtocolError> {
        match self.kind {
            NotificationKind::Reply => {
                ReservationReply::from_wire(self.value).map(Notification::Reply)
            }
            NotificationKind::Screening => {
                ScreeningEvent::from_wire(self.value).map(Notification::Screening)
            }
        }
    }
}
