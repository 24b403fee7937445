//! The authoritative room registry.
//!
//! [`RoomTable`] owns every room in indexed storage and enforces the
//! cross-room invariants. [`SharedRooms`] puts it behind a read/write lock
//! so the dispatcher (writer) and the room schedulers (readers, plus the
//! post-screening reset) all see the same, current occupancy.

use std::collections::HashMap;
use std::sync::Arc;

use boxoffice_protocol::{ClientId, FilmId, ReservationReply, ReservationRequest, RoomId};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Room, RoomError, RoomInfo, RoomSpec};

/// What [`RoomTable::reserve`] did, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// The reply to send back to the requester.
    pub reply: ReservationReply,
    /// The room whose film matched, if any.
    pub room_id: Option<RoomId>,
    /// A seat the requester still held from an earlier cycle and lost.
    pub released: Option<RoomId>,
    /// Seats left in the matching room after the decision.
    pub free_after: Option<usize>,
}

/// Every room, indexed by id, plus the client → room index.
#[derive(Debug, Default)]
pub struct RoomTable {
    /// Arena of rooms in configuration order.
    rooms: Vec<Room>,

    /// Room id → position in `rooms`.
    index: HashMap<RoomId, usize>,

    /// Which room each seated client is in. A client is in at most ONE
    /// room at a time (key invariant).
    seats: HashMap<ClientId, RoomId>,
}

impl RoomTable {
    /// Builds the table from static configuration.
    ///
    /// # Errors
    /// - [`RoomError::DuplicateRoom`]: two specs share a room id
    /// - [`RoomError::RoomIdOutOfRange`]: a room id does not fit the
    ///   notification payload
    pub fn from_specs(specs: &[RoomSpec]) -> Result<Self, RoomError> {
        let mut table = Self::default();
        for spec in specs {
            if !spec.room_id.fits_wire() {
                return Err(RoomError::RoomIdOutOfRange(spec.room_id));
            }
            if table.index.contains_key(&spec.room_id) {
                return Err(RoomError::DuplicateRoom(spec.room_id));
            }
            table.index.insert(spec.room_id, table.rooms.len());
            table.rooms.push(Room::from_spec(spec));
        }
        Ok(table)
    }

    /// Looks up a room by id.
    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.index.get(&room_id).map(|&i| &self.rooms[i])
    }

    fn get_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.index.get(&room_id).map(|&i| &mut self.rooms[i])
    }

    /// The room a client currently holds a seat in.
    pub fn seat_of(&self, client_id: ClientId) -> Option<RoomId> {
        self.seats.get(&client_id).copied()
    }

    /// Decides one reservation request.
    ///
    /// Finds the first room showing the requested film and then:
    /// 1. requester younger than `min_age` → `RejectedAgeRestricted`
    /// 2. no free seat → `RejectedRoomFull`
    /// 3. otherwise seat the requester → `Accepted(room_id)`
    ///
    /// Rejections never touch any room. No matching room yields
    /// `RejectedNoSuchFilm`.
    ///
    /// A requester that still holds a seat from an earlier cycle (it gave
    /// up waiting and asked again) loses that seat before the request is
    /// evaluated, so it never holds two seats.
    pub fn reserve(&mut self, request: &ReservationRequest) -> Reservation {
        let requester = request.requester_id;
        let released = self.release(requester);

        let Some(idx) = self
            .rooms
            .iter()
            .position(|r| r.film_id() == request.desired_film_id)
        else {
            return Reservation {
                reply: ReservationReply::RejectedNoSuchFilm,
                room_id: None,
                released,
                free_after: None,
            };
        };

        let room = &mut self.rooms[idx];
        let room_id = room.room_id();

        let reply = if request.requester_age < room.min_age() {
            ReservationReply::RejectedAgeRestricted
        } else {
            match room.seat(requester) {
                Ok(()) => {
                    self.seats.insert(requester, room_id);
                    ReservationReply::Accepted(room_id)
                }
                // `release` above guarantees the requester is not seated,
                // so the only way seating fails is a full room.
                Err(_) => ReservationReply::RejectedRoomFull,
            }
        };

        Reservation {
            reply,
            room_id: Some(room_id),
            released,
            free_after: Some(self.rooms[idx].free_count()),
        }
    }

    /// Frees whatever seat `client_id` holds. Returns the room it was in.
    pub fn release(&mut self, client_id: ClientId) -> Option<RoomId> {
        let room_id = self.seats.remove(&client_id)?;
        if let Some(room) = self.get_mut(room_id) {
            room.unseat(client_id);
        }
        Some(room_id)
    }

    /// Copies the current seated list of a room.
    pub fn seated(&self, room_id: RoomId) -> Result<Vec<ClientId>, RoomError> {
        self.get(room_id)
            .map(|r| r.seated().to_vec())
            .ok_or(RoomError::NotFound(room_id))
    }

    /// Clears a room and returns who was seated.
    ///
    /// Idempotent: resetting an empty room returns an empty list.
    pub fn reset(&mut self, room_id: RoomId) -> Result<Vec<ClientId>, RoomError> {
        let room = self.get_mut(room_id).ok_or(RoomError::NotFound(room_id))?;
        let cleared = room.reset();
        for client in &cleared {
            self.seats.remove(client);
        }
        Ok(cleared)
    }

    /// Verifies every cross-room invariant.
    ///
    /// - `free_count + |seated| == capacity` for every room
    /// - no client is seated twice, in one room or across rooms
    /// - the client → room index matches the rooms exactly
    pub fn check_invariants(&self) -> Result<(), RoomError> {
        let mut seen: HashMap<ClientId, RoomId> = HashMap::new();
        for room in &self.rooms {
            if room.free_count() + room.seated().len() != room.capacity() {
                return Err(RoomError::InvariantViolated(format!(
                    "{}: free {} + seated {} != capacity {}",
                    room.room_id(),
                    room.free_count(),
                    room.seated().len(),
                    room.capacity()
                )));
            }
            for &client in room.seated() {
                if let Some(other) = seen.insert(client, room.room_id()) {
                    return Err(RoomError::InvariantViolated(format!(
                        "{client} seated in both {other} and {}",
                        room.room_id()
                    )));
                }
            }
        }
        if seen != self.seats {
            return Err(RoomError::InvariantViolated(
                "seat index out of sync with rooms".into(),
            ));
        }
        Ok(())
    }

    /// Snapshots of every room, in configuration order.
    pub fn infos(&self) -> Vec<RoomInfo> {
        self.rooms.iter().map(Room::info).collect()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if the table holds no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Drops every room. Used at teardown.
    pub fn clear(&mut self) {
        self.rooms.clear();
        self.index.clear();
        self.seats.clear();
    }
}

/// The room table behind a read/write lock, shared by the dispatcher and
/// every room scheduler.
///
/// Cheap to clone. Readers must not keep a guard, or anything copied out of
/// one, across their own suspension points; they re-read on every use.
#[derive(Debug, Clone)]
pub struct SharedRooms {
    inner: Arc<RwLock<RoomTable>>,
}

impl SharedRooms {
    /// Wraps a table for sharing.
    pub fn new(table: RoomTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Builds and wraps a table from configuration.
    pub fn from_specs(specs: &[RoomSpec]) -> Result<Self, RoomError> {
        RoomTable::from_specs(specs).map(Self::new)
    }

    /// Shared read access.
    pub async fn read(&self) -> RwLockReadGuard<'_, RoomTable> {
        self.inner.read().await
    }

    /// Exclusive write access.
    pub async fn write(&self) -> RwLockWriteGuard<'_, RoomTable> {
        self.inner.write().await
    }

    /// The clients seated in `room_id` right now.
    pub async fn seated(&self, room_id: RoomId) -> Result<Vec<ClientId>, RoomError> {
        self.read().await.seated(room_id)
    }

    /// Atomically reads and clears a room's seated set.
    ///
    /// Taking both under one write guard means no seat assigned between the
    /// read and the reset can be lost without its holder being told.
    pub async fn drain(&self, room_id: RoomId) -> Result<Vec<ClientId>, RoomError> {
        let mut table = self.write().await;
        let cleared = table.reset(room_id)?;
        if let Err(e) = table.check_invariants() {
            tracing::error!(%room_id, error = %e, "room invariant violated after reset");
        }
        Ok(cleared)
    }

    /// Snapshot of one room's metadata.
    pub async fn info(&self, room_id: RoomId) -> Result<RoomInfo, RoomError> {
        self.read()
            .await
            .get(room_id)
            .map(Room::info)
            .ok_or(RoomError::NotFound(room_id))
    }
}
