//! Room specification and the room itself.

use boxoffice_protocol::{ClientId, FilmId, RoomId};
use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomSpec
// ---------------------------------------------------------------------------

/// Static configuration for one room, read at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    /// Unique id. Must fit the 16-bit notification field.
    pub room_id: RoomId,

    /// Number of seats. Fixed for the room's lifetime.
    pub capacity: usize,

    /// The film this room shows.
    pub film_id: FilmId,

    /// Minimum admission age (inclusive).
    #[serde(default)]
    pub min_age: u8,
}

impl RoomSpec {
    /// Shorthand used by tests and the default configuration.
    pub fn new(room_id: u32, capacity: usize, film_id: u32, min_age: u8) -> Self {
        Self {
            room_id: RoomId(room_id),
            capacity,
            film_id: FilmId(film_id),
            min_age,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A screening room: fixed capacity, one film, one age threshold.
///
/// `free_count` is derived from `seated`, so `free_count + seated == capacity`
/// holds by construction; the table only has to make sure `seated` never
/// exceeds `capacity` and never holds the same client twice.
#[derive(Debug, Clone)]
pub struct Room {
    room_id: RoomId,
    capacity: usize,
    film_id: FilmId,
    min_age: u8,
    /// Clients holding a seat, in the order the dispatcher seated them.
    seated: Vec<ClientId>,
}

impl Room {
    /// Creates an empty room from its spec.
    pub fn from_spec(spec: &RoomSpec) -> Self {
        Self {
            room_id: spec.room_id,
            capacity: spec.capacity,
            film_id: spec.film_id,
            min_age: spec.min_age,
            seated: Vec::with_capacity(spec.capacity),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn film_id(&self) -> FilmId {
        self.film_id
    }

    pub fn min_age(&self) -> u8 {
        self.min_age
    }

    /// Seats still available. Never negative.
    pub fn free_count(&self) -> usize {
        self.capacity.saturating_sub(self.seated.len())
    }

    /// Returns `true` when no seat is free.
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    /// Seated clients in seating order.
    pub fn seated(&self) -> &[ClientId] {
        &self.seated
    }

    /// Returns `true` if `client_id` holds a seat here.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.seated.contains(&client_id)
    }

    /// Assigns a seat to `client_id`.
    ///
    /// # Errors
    /// - [`RoomError::RoomFull`]: no free seat
    /// - [`RoomError::AlreadySeated`]: the client already holds a seat here
    pub(crate) fn seat(&mut self, client_id: ClientId) -> Result<(), RoomError> {
        if self.contains(client_id) {
            return Err(RoomError::AlreadySeated(client_id, self.room_id));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.room_id));
        }
        self.seated.push(client_id);
        Ok(())
    }

    /// Frees `client_id`'s seat. Returns `false` if it held none.
    pub(crate) fn unseat(&mut self, client_id: ClientId) -> bool {
        let before = self.seated.len();
        self.seated.retain(|c| *c != client_id);
        self.seated.len() != before
    }

    /// Clears every seat and returns who was seated.
    ///
    /// Idempotent: a second call returns an empty list and leaves the room
    /// with `free_count == capacity`.
    pub(crate) fn reset(&mut self) -> Vec<ClientId> {
        std::mem::take(&mut self.seated)
    }

    /// A copyable snapshot of this room's metadata.
    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id,
            film_id: self.film_id,
            min_age: self.min_age,
            capacity: self.capacity,
            free_count: self.free_count(),
        }
    }
}

/// A snapshot of room metadata, safe to hold across suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub film_id: FilmId,
    pub min_age: u8,
    pub capacity: usize,
    pub free_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(capacity: usize) -> Room {
        Room::from_spec(&RoomSpec::new(1, capacity, 101, 18))
    }

    #[test]
    fn test_new_room_is_empty() {
        let r = room(3);
        assert_eq!(r.free_count(), 3);
        assert!(r.seated().is_empty());
        assert!(!r.is_full());
    }

    #[test]
    fn test_seat_decrements_free_count() {
        let mut r = room(2);
        r.seat(ClientId(1)).unwrap();
        assert_eq!(r.free_count(), 1);
        assert_eq!(r.seated(), &[ClientId(1)]);
    }

    #[test]
    fn test_seat_full_room_returns_room_full() {
        let mut r = room(1);
        r.seat(ClientId(1)).unwrap();

        let result = r.seat(ClientId(2));
        assert!(matches!(result, Err(RoomError::RoomFull(RoomId(1)))));
        assert_eq!(r.seated(), &[ClientId(1)]);
    }

    #[test]
    fn test_seat_twice_returns_already_seated() {
        let mut r = room(5);
        r.seat(ClientId(1)).unwrap();

        let result = r.seat(ClientId(1));
        assert!(matches!(result, Err(RoomError::AlreadySeated(ClientId(1), RoomId(1)))));
        assert_eq!(r.free_count(), 4);
    }

    #[test]
    fn test_zero_capacity_room_is_always_full() {
        let mut r = room(0);
        assert!(r.is_full());
        assert!(r.seat(ClientId(1)).is_err());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut r = room(3);
        r.seat(ClientId(1)).unwrap();
        r.seat(ClientId(2)).unwrap();

        assert_eq!(r.reset(), vec![ClientId(1), ClientId(2)]);
        let once = r.info();
        assert!(r.reset().is_empty());
        assert_eq!(r.info(), once);
        assert_eq!(r.free_count(), r.capacity());
    }

    #[test]
    fn test_unseat_reports_whether_seat_was_held() {
        let mut r = room(3);
        r.seat(ClientId(1)).unwrap();
        assert!(r.unseat(ClientId(1)));
        assert!(!r.unseat(ClientId(1)));
        assert_eq!(r.free_count(), 3);
    }

    #[test]
    fn test_room_spec_min_age_defaults_to_zero() {
        let spec: RoomSpec =
            serde_json::from_str(r#"{"room_id": 7, "capacity": 10, "film_id": 107}"#).unwrap();
        assert_eq!(spec, RoomSpec::new(7, 10, 107, 0));
    }
}
