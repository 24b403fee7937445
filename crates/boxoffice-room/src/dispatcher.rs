//! The reservation dispatcher: a single Tokio task that owns every seat
//! decision.
//!
//! Requests arrive one at a time on the request channel, so seat
//! assignment is serialized without any per-request locking beyond the
//! room table's write guard. For each request the dispatcher decides,
//! updates the table, and sends exactly one reply to the requester's
//! inbox through the client registry.

use boxoffice_channel::{ChannelError, RequestReceiver, ShutdownSignal};
use boxoffice_protocol::{RequestRecord, ReservationReply, ReservationRequest};
use boxoffice_registry::{ClientRegistry, RegistryError};
use tokio::task::JoinHandle;

use crate::table::{Reservation, SharedRooms};

/// Counters the dispatcher keeps over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Requests decided.
    pub handled: u64,
    pub accepted: u64,
    pub rejected_age: u64,
    pub rejected_full: u64,
    pub rejected_no_film: u64,
    /// Records dropped because they were not reservation requests.
    pub malformed: u64,
    /// Replies whose requester could not be reached.
    pub undelivered: u64,
}

impl DispatcherStats {
    fn record(&mut self, reply: ReservationReply) {
        self.handled += 1;
        match reply {
            ReservationReply::Accepted(_) => self.accepted += 1,
            ReservationReply::RejectedAgeRestricted => self.rejected_age += 1,
            ReservationReply::RejectedRoomFull => self.rejected_full += 1,
            ReservationReply::RejectedNoSuchFilm => self.rejected_no_film += 1,
        }
    }
}

/// The dispatcher actor. Build with [`Dispatcher::new`], then either drive
/// it yourself with [`handle`](Self::handle) or hand it to
/// [`spawn_dispatcher`].
pub struct Dispatcher {
    rooms: SharedRooms,
    registry: ClientRegistry,
    requests: RequestReceiver,
    shutdown: ShutdownSignal,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(
        rooms: SharedRooms,
        registry: ClientRegistry,
        requests: RequestReceiver,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            rooms,
            registry,
            requests,
            shutdown,
            stats: DispatcherStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    /// Runs the dispatch loop until shutdown fires or every request sender
    /// is gone. Returns the final counters.
    pub async fn run(mut self) -> DispatcherStats {
        tracing::info!("dispatcher started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    tracing::info!("dispatcher shutting down");
                    break;
                }
                record = self.requests.recv() => match record {
                    Some(record) => {
                        self.handle(record).await;
                    }
                    None => {
                        tracing::info!("request channel closed");
                        break;
                    }
                },
            }
        }

        self.requests.close();
        tracing::info!(
            handled = self.stats.handled,
            accepted = self.stats.accepted,
            malformed = self.stats.malformed,
            undelivered = self.stats.undelivered,
            "dispatcher stopped"
        );
        self.stats
    }

    /// Decides one record and replies to its requester.
    ///
    /// Returns the reply, or `None` if the record was not a reservation
    /// request and was dropped.
    pub async fn handle(&mut self, record: RequestRecord) -> Option<ReservationReply> {
        let request = match ReservationRequest::try_from(record) {
            Ok(request) => request,
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(
                    client_id = %record.requester_id,
                    error = %e,
                    "dropping malformed request record"
                );
                return None;
            }
        };

        tracing::info!(
            client_id = %request.requester_id,
            film_id = %request.desired_film_id,
            age = request.requester_age,
            "reservation request received"
        );

        // The reply is queued before the write guard is released, so a
        // room drain can never see the new seat before its holder has been
        // told about it. Lock order is always rooms, then registry.
        let rooms = self.rooms.clone();
        let mut table = rooms.write().await;
        let outcome = table.reserve(&request);
        log_outcome(&request, &outcome);
        self.stats.record(outcome.reply);

        if !self.reply(&request, outcome.reply).await && outcome.reply.is_accepted() {
            if let Some(room_id) = table.release(request.requester_id) {
                tracing::debug!(client_id = %request.requester_id, %room_id, "released unconfirmed seat");
            }
        }
        if let Err(e) = table.check_invariants() {
            tracing::error!(error = %e, "room invariant violated after reservation");
        }
        Some(outcome.reply)
    }

    /// Sends `reply` to the requester. Returns `false` if it could not be
    /// delivered.
    async fn reply(&mut self, request: &ReservationRequest, reply: ReservationReply) -> bool {
        let client_id = request.requester_id;
        let Err(error) = self.registry.deliver(client_id, reply).await else {
            return true;
        };
        self.stats.undelivered += 1;

        match &error {
            RegistryError::Delivery(ChannelError::InboxClosed(_)) => {
                tracing::debug!(%client_id, %reply, "requester has exited, reply dropped");
            }
            _ => {
                tracing::warn!(%client_id, %reply, %error, "reply undeliverable");
            }
        }
        false
    }
}

fn log_outcome(request: &ReservationRequest, outcome: &Reservation) {
    let client_id = request.requester_id;
    if let Some(room_id) = outcome.released {
        tracing::info!(%client_id, %room_id, "released stale seat before re-request");
    }
    match (outcome.reply, outcome.room_id) {
        (ReservationReply::Accepted(room_id), _) => tracing::info!(
            %client_id,
            %room_id,
            free = outcome.free_after,
            "seat assigned"
        ),
        (ReservationReply::RejectedAgeRestricted, Some(room_id)) => tracing::info!(
            %client_id,
            %room_id,
            age = request.requester_age,
            "rejected: below minimum age"
        ),
        (ReservationReply::RejectedRoomFull, Some(room_id)) => {
            tracing::info!(%client_id, %room_id, "rejected: room full")
        }
        (reply, _) => tracing::info!(
            %client_id,
            film_id = %request.desired_film_id,
            %reply,
            "rejected: no room shows this film"
        ),
    }
}

/// Spawns the dispatcher on the Tokio runtime.
///
/// The task ends when `shutdown` fires or when every request sender has
/// been dropped; its output is the final [`DispatcherStats`].
pub fn spawn_dispatcher(
    rooms: SharedRooms,
    registry: ClientRegistry,
    requests: RequestReceiver,
    shutdown: ShutdownSignal,
) -> JoinHandle<DispatcherStats> {
    tokio::spawn(Dispatcher::new(rooms, registry, requests, shutdown).run())
}
