//! The room scheduler actor: one Tokio task per room.
//!
//! On every phase change the scheduler reads the room's seated set from the
//! shared room table *at that moment* and notifies each seated client:
//!
//! - IDLE → SCREENING: `Start` to everyone seated right now
//! - SCREENING → IDLE: the room is drained (seated list taken and cleared
//!   under one write guard), then `End` goes to everyone drained
//!
//! No occupancy is kept between phase changes.

use boxoffice_channel::{ChannelError, ShutdownSignal};
use boxoffice_protocol::{ClientId, RoomId, ScreeningEvent, ScreeningKind};
use boxoffice_registry::{ClientRegistry, RegistryError};
use boxoffice_room::{RoomError, SharedRooms};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{PhaseChange, ScheduleConfig, ScreeningClock};

/// Delivery counters kept by a room scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Full IDLE → SCREENING → IDLE cycles completed.
    pub cycles: u64,
    /// `Start` notifications delivered.
    pub starts_delivered: u64,
    /// `End` notifications delivered.
    pub ends_delivered: u64,
    /// Notifications whose recipient could not be reached.
    pub dropped: u64,
}

/// One room's scheduler.
pub struct RoomScheduler {
    room_id: RoomId,
    clock: ScreeningClock,
    rooms: SharedRooms,
    registry: ClientRegistry,
    shutdown: ShutdownSignal,
    metrics: SchedulerMetrics,
}

impl RoomScheduler {
    /// Creates a scheduler for `room_id`.
    ///
    /// # Errors
    /// [`RoomError::RoomIdOutOfRange`] if the id cannot be carried by a
    /// screening payload.
    pub fn new(
        room_id: RoomId,
        config: ScheduleConfig,
        rooms: SharedRooms,
        registry: ClientRegistry,
        shutdown: ShutdownSignal,
    ) -> Result<Self, RoomError> {
        if !room_id.fits_wire() {
            return Err(RoomError::RoomIdOutOfRange(room_id));
        }
        Ok(Self {
            room_id,
            clock: ScreeningClock::new(config),
            rooms,
            registry,
            shutdown,
            metrics: SchedulerMetrics::default(),
        })
    }

    /// Runs the cycle until shutdown. Returns the final counters.
    pub async fn run(mut self) -> SchedulerMetrics {
        info!(room_id = %self.room_id, "room scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                change = self.clock.wait_for_change() => {
                    if let Err(e) = self.on_phase_change(change).await {
                        // The room is gone (teardown cleared the table).
                        warn!(room_id = %self.room_id, error = %e, "room unavailable, stopping");
                        break;
                    }
                }
            }
        }

        info!(
            room_id = %self.room_id,
            cycles = self.metrics.cycles,
            starts = self.metrics.starts_delivered,
            ends = self.metrics.ends_delivered,
            dropped = self.metrics.dropped,
            "room scheduler stopped"
        );
        self.metrics
    }

    /// Handles one phase change: reads the current occupancy and notifies.
    pub async fn on_phase_change(&mut self, change: PhaseChange) -> Result<(), RoomError> {
        let kind = change.event();
        let recipients = match kind {
            ScreeningKind::Start => self.rooms.seated(self.room_id).await?,
            ScreeningKind::End => self.rooms.drain(self.room_id).await?,
        };

        info!(
            room_id = %self.room_id,
            cycle = change.cycle,
            event = %kind,
            audience = recipients.len(),
            late_ms = change.late_by.as_millis() as u64,
            "screening {}",
            if kind == ScreeningKind::Start { "started" } else { "ended" }
        );

        let event = ScreeningEvent::new(kind, self.room_id)
            .map_err(|_| RoomError::RoomIdOutOfRange(self.room_id))?;
        let delivered = self.broadcast(event, &recipients).await;

        match kind {
            ScreeningKind::Start => self.metrics.starts_delivered += delivered,
            ScreeningKind::End => {
                self.metrics.ends_delivered += delivered;
                self.metrics.cycles += 1;
                info!(room_id = %self.room_id, "room reset");
            }
        }
        Ok(())
    }

    /// Delivers `event` to each recipient. Returns how many it reached.
    async fn broadcast(&mut self, event: ScreeningEvent, recipients: &[ClientId]) -> u64 {
        let mut delivered = 0;
        for &client_id in recipients {
            match self.registry.deliver(client_id, event).await {
                Ok(()) => delivered += 1,
                Err(RegistryError::Delivery(ChannelError::InboxClosed(_))) => {
                    self.metrics.dropped += 1;
                    debug!(%client_id, room_id = %self.room_id, "client exited, event dropped");
                }
                Err(e) => {
                    self.metrics.dropped += 1;
                    warn!(%client_id, room_id = %self.room_id, error = %e, "event undeliverable");
                }
            }
        }
        delivered
    }
}

/// Spawns a scheduler task for `room_id`.
pub fn spawn_scheduler(
    room_id: RoomId,
    config: ScheduleConfig,
    rooms: SharedRooms,
    registry: ClientRegistry,
    shutdown: ShutdownSignal,
) -> Result<JoinHandle<SchedulerMetrics>, RoomError> {
    let scheduler = RoomScheduler::new(room_id, config, rooms, registry, shutdown)?;
    Ok(tokio::spawn(scheduler.run()))
}
