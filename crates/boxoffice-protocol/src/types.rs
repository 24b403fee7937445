//! Core protocol types for the boxoffice wire format.
//!
//! Every type in this module either travels between actors (requests,
//! replies, screening events) or names something that does (ids). Actors
//! never share these values by reference; they are copied into channels.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a client actor.
///
/// Newtype over `u32` so a `ClientId` can never be passed where a `RoomId`
/// or `FilmId` is expected. Serialized as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A unique identifier for a screening room.
///
/// Stored as `u32` so configuration can express any value, but only ids
/// that fit [`RoomId::MAX_WIRE`] can be packed into a screening payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl RoomId {
    /// Largest room id representable in the 16-bit payload field.
    pub const MAX_WIRE: u32 = 0xFFFF;

    /// Returns `true` if this id survives a round-trip through the
    /// notification codec without truncation.
    pub fn fits_wire(self) -> bool {
        self.0 <= Self::MAX_WIRE
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifies the film shown in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilmId(pub u32);

impl fmt::Display for FilmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Reservation request
// ---------------------------------------------------------------------------

/// Tag value carried by every reservation record on the request channel.
pub const REQUEST_KIND: u32 = 2;

/// A client's request for a seat at a given film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Who is asking. Replies are routed back to this id.
    pub requester_id: ClientId,
    /// The film the client wants to see.
    pub desired_film_id: FilmId,
    /// Age used for the room's admission threshold.
    pub requester_age: u8,
}

/// The record that actually travels on the request channel.
///
/// `kind` lets the dispatcher reject foreign records that share the
/// channel. Build one with `RequestRecord::from(request)` and recover the
/// request with `ReservationRequest::try_from(record)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub kind: u32,
    pub requester_id: ClientId,
    pub desired_film_id: FilmId,
    pub requester_age: u8,
}

impl From<ReservationRequest> for RequestRecord {
    fn from(req: ReservationRequest) -> Self {
        Self {
            kind: REQUEST_KIND,
            requester_id: req.requester_id,
            desired_film_id: req.desired_film_id,
            requester_age: req.requester_age,
        }
    }
}

impl TryFrom<RequestRecord> for ReservationRequest {
    type Error = ProtocolError;

    fn try_from(record: RequestRecord) -> Result<Self, Self::Error> {
        if record.kind != REQUEST_KIND {
            return Err(ProtocolError::UnexpectedRecordKind(record.kind));
        }
        Ok(Self {
            requester_id: record.requester_id,
            desired_film_id: record.desired_film_id,
            requester_age: record.requester_age,
        })
    }
}

// ---------------------------------------------------------------------------
// Replies and screening events
// ---------------------------------------------------------------------------

/// The dispatcher's answer to one [`ReservationRequest`].
///
/// A tagged enum rather than an integer: a rejection can never be confused
/// with a room id. The integer form only exists on the wire (see
/// [`crate::WireValue`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationReply {
    /// A seat was assigned in the given room.
    Accepted(RoomId),
    /// The requester is younger than the room's minimum age.
    RejectedAgeRestricted,
    /// The room showing the film has no free seats.
    RejectedRoomFull,
    /// No room is showing the requested film.
    RejectedNoSuchFilm,
}

impl ReservationReply {
    /// Returns `true` for [`ReservationReply::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

impl fmt::Display for ReservationReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(room) => write!(f, "accepted in {room}"),
            Self::RejectedAgeRestricted => write!(f, "rejected: age restricted"),
            Self::RejectedRoomFull => write!(f, "rejected: room full"),
            Self::RejectedNoSuchFilm => write!(f, "rejected: no such film"),
        }
    }
}

/// Which edge of a screening an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreeningKind {
    Start,
    End,
}

impl fmt::Display for ScreeningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Broadcast by a room scheduler to every client seated in `room_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningEvent {
    pub kind: ScreeningKind,
    pub room_id: RoomId,
}

impl ScreeningEvent {
    /// Builds an event, rejecting room ids that would be truncated on the
    /// wire.
    pub fn new(kind: ScreeningKind, room_id: RoomId) -> Result<Self, ProtocolError> {
        if !room_id.fits_wire() {
            return Err(ProtocolError::RoomIdOutOfRange(room_id));
        }
        Ok(Self { kind, room_id })
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Anything a client can find in its inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Correlated answer to the client's last request.
    Reply(ReservationReply),
    /// Unsolicited screening start/end.
    Screening(ScreeningEvent),
}

impl From<ReservationReply> for Notification {
    fn from(reply: ReservationReply) -> Self {
        Self::Reply(reply)
    }
}

impl From<ScreeningEvent> for Notification {
    fn from(event: ScreeningEvent) -> Self {
        Self::Screening(event)
    }
}

/// Which of the two notification lanes a payload travels on.
///
/// The lane decides how `value` is interpreted: replies use sentinels,
/// screening events use the packed kind/room layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Reply,
    Screening,
}

/// The integer payload delivered into a client's inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub value: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(ClientId(3).to_string(), "C-3");
        assert_eq!(RoomId(1).to_string(), "R-1");
        assert_eq!(FilmId(101).to_string(), "F-101");
    }

    #[test]
    fn test_room_id_fits_wire_boundary() {
        assert!(RoomId(0).fits_wire());
        assert!(RoomId(0xFFFF).fits_wire());
        assert!(!RoomId(0x1_0000).fits_wire());
    }

    #[test]
    fn test_request_record_carries_request_kind() {
        let req = ReservationRequest {
            requester_id: ClientId(7),
            desired_film_id: FilmId(101),
            requester_age: 20,
        };
        let record = RequestRecord::from(req);
        assert_eq!(record.kind, REQUEST_KIND);
        assert_eq!(ReservationRequest::try_from(record).unwrap(), req);
    }

    #[test]
    fn test_request_record_foreign_kind_rejected() {
        let record = RequestRecord {
            kind: 9,
            requester_id: ClientId(1),
            desired_film_id: FilmId(1),
            requester_age: 1,
        };
        assert!(matches!(
            ReservationRequest::try_from(record),
            Err(ProtocolError::UnexpectedRecordKind(9))
        ));
    }

    #[test]
    fn test_request_record_json_shape() {
        let record = RequestRecord::from(ReservationRequest {
            requester_id: ClientId(4),
            desired_film_id: FilmId(102),
            requester_age: 33,
        });
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["kind"], 2);
        assert_eq!(json["requester_id"], 4);
        assert_eq!(json["desired_film_id"], 102);
        assert_eq!(json["requester_age"], 33);
    }

    #[test]
    fn test_screening_event_new_rejects_wide_room_id() {
        let result = ScreeningEvent::new(ScreeningKind::Start, RoomId(70_000));
        assert!(matches!(
            result,
            Err(ProtocolError::RoomIdOutOfRange(RoomId(70_000)))
        ));
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(
            ReservationReply::Accepted(RoomId(2)).to_string(),
            "accepted in R-2"
        );
        assert!(!ReservationReply::RejectedRoomFull.is_accepted());
    }
}
