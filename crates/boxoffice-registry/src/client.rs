//! Client types: the per-customer record and its state machine.
//!
//! A client record tracks:
//! - WHO the customer is (`ClientId`) and how to reach them (`inbox`)
//! - WHAT they want next (`age`, `film_id`)
//! - WHERE they are seated, once a reservation is accepted (`room_id`)
//! - WHICH step of the reservation cycle they are in (`status`)

use std::fmt;

use boxoffice_channel::NotificationSender;
use boxoffice_protocol::{
    ClientId, FilmId, Notification, ReservationReply, ReservationRequest, RoomId,
    ScreeningEvent, ScreeningKind,
};
use rand::Rng;

use crate::RegistryError;

// ---------------------------------------------------------------------------
// ClientStatus
// ---------------------------------------------------------------------------

/// Where a client is in its reservation cycle.
///
/// ```text
///   Free ──(submit)──▶ AwaitingConfirmation ──(Accepted)──▶ ConfirmedWaiting
///    ▲                        │                                 │
///    │                   (rejected)                          (Start)
///    │                        │                                 ▼
///    └────────(reset)─────────┴──────────(End)─────────────  Watching
/// ```
///
/// A client that receives the `End` of its room while still
/// `ConfirmedWaiting` was seated during a screening already under way; it
/// resets as well, since the room reset cleared its seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientStatus {
    /// No reservation in progress.
    Free,
    /// Request submitted, waiting for the dispatcher's reply.
    AwaitingConfirmation,
    /// Seat confirmed, waiting for the screening to start.
    ConfirmedWaiting,
    /// Screening in progress.
    Watching,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::AwaitingConfirmation => write!(f, "awaiting confirmation"),
            Self::ConfirmedWaiting => write!(f, "confirmed, waiting"),
            Self::Watching => write!(f, "watching"),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientProfile
// ---------------------------------------------------------------------------

/// The randomized part of a client: age and the film it wants to see.
///
/// Drawn once at creation and again on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub age: u8,
    pub film_id: FilmId,
}

impl ClientProfile {
    /// Draws an age uniformly from `0..max_age` and a film uniformly from
    /// `films`.
    ///
    /// Returns `None` if `films` is empty.
    pub fn random(films: &[FilmId], max_age: u8) -> Option<Self> {
        let mut rng = rand::rng();
        let film_id = films.get(rng.random_range(0..films.len().max(1)))?;
        let age = if max_age == 0 { 0 } else { rng.random_range(0..max_age) };
        Some(Self { age, film_id: *film_id })
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Why a notification did not move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A screening event for a room other than the client's own.
    RoomMismatch {
        expected: Option<RoomId>,
        received: RoomId,
    },
    /// A notification that makes no sense in the current state (a late
    /// reply after a timeout, a second `Start`, ...).
    Unexpected(ClientStatus),
}

/// The outcome of feeding one notification to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Reservation accepted; now waiting in `room`.
    Confirmed(RoomId),
    /// Reservation rejected; the client is free again.
    Rejected(ReservationReply),
    /// Screening started in the client's room.
    Started(RoomId),
    /// Screening ended; the client is free again.
    Finished(RoomId),
    /// The client's room finished a screening the client never saw start.
    Missed(RoomId),
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl Transition {
    /// Returns `true` if this transition returned the client to
    /// [`ClientStatus::Free`], meaning the caller should draw a new
    /// profile.
    pub fn needs_reset(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Finished(_) | Self::Missed(_))
    }
}

// ---------------------------------------------------------------------------
// ClientRecord
// ---------------------------------------------------------------------------

/// A single client's entry in the registry.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Identity used for routing replies back.
    pub client_id: ClientId,

    /// Age presented with the next request.
    pub age: u8,

    /// Film of interest while free; the requested film otherwise.
    pub film_id: FilmId,

    /// Room holding this client's seat, once accepted.
    pub room_id: Option<RoomId>,

    /// Current step of the reservation cycle.
    pub status: ClientStatus,

    /// Delivery handle for this client's inbox.
    pub inbox: NotificationSender,
}

impl ClientRecord {
    /// Creates a free client with the given profile.
    pub fn new(inbox: NotificationSender, profile: ClientProfile) -> Self {
        Self {
            client_id: inbox.client_id(),
            age: profile.age,
            film_id: profile.film_id,
            room_id: None,
            status: ClientStatus::Free,
            inbox,
        }
    }

    /// Moves a free client to `AwaitingConfirmation` and returns the request
    /// to submit.
    ///
    /// # Errors
    /// [`RegistryError::InvalidTransition`] if the client is not free.
    pub fn begin_request(&mut self) -> Result<ReservationRequest, RegistryError> {
        if self.status != ClientStatus::Free {
            return Err(RegistryError::InvalidTransition {
                client_id: self.client_id,
                status: self.status,
            });
        }
        self.status = ClientStatus::AwaitingConfirmation;
        Ok(ReservationRequest {
            requester_id: self.client_id,
            desired_film_id: self.film_id,
            requester_age: self.age,
        })
    }

    /// Applies one notification to the state machine.
    pub fn apply(&mut self, notification: Notification) -> Transition {
        match (self.status, notification) {
            (ClientStatus::AwaitingConfirmation, Notification::Reply(reply)) => match reply {
                ReservationReply::Accepted(room) => {
                    self.room_id = Some(room);
                    self.status = ClientStatus::ConfirmedWaiting;
                    Transition::Confirmed(room)
                }
                rejected => {
                    self.release();
                    Transition::Rejected(rejected)
                }
            },
            (status, Notification::Reply(_)) => Transition::Ignored(IgnoreReason::Unexpected(status)),
            (status, Notification::Screening(event)) => self.apply_screening(status, event),
        }
    }

    fn apply_screening(&mut self, status: ClientStatus, event: ScreeningEvent) -> Transition {
        if self.room_id != Some(event.room_id) {
            return Transition::Ignored(IgnoreReason::RoomMismatch {
                expected: self.room_id,
                received: event.room_id,
            });
        }
        match (status, event.kind) {
            (ClientStatus::ConfirmedWaiting, ScreeningKind::Start) => {
                self.status = ClientStatus::Watching;
                Transition::Started(event.room_id)
            }
            (ClientStatus::Watching, ScreeningKind::End) => {
                self.release();
                Transition::Finished(event.room_id)
            }
            (ClientStatus::ConfirmedWaiting, ScreeningKind::End) => {
                self.release();
                Transition::Missed(event.room_id)
            }
            (status, _) => Transition::Ignored(IgnoreReason::Unexpected(status)),
        }
    }

    /// Returns the client to `Free` with a fresh profile.
    ///
    /// Resetting an already-reset client is a no-op apart from the new
    /// profile.
    pub fn reset(&mut self, profile: ClientProfile) {
        self.release();
        self.age = profile.age;
        self.film_id = profile.film_id;
    }

    /// Drops any assignment and marks the client free, keeping its profile.
    pub fn release(&mut self) {
        self.room_id = None;
        self.status = ClientStatus::Free;
    }
}
