//! `Cinema` builder and simulation bootstrap.
//!
//! This is the entry point for running a simulation. It ties together every
//! layer: room table → dispatcher → room schedulers → client actors.

use std::sync::Arc;

use boxoffice_channel::{request_channel, shutdown_channel, RequestSender};
use boxoffice_protocol::{ClientId, FilmId, RoomId};
use boxoffice_registry::{ClientProfile, ClientRegistry};
use boxoffice_room::{spawn_dispatcher, DispatcherStats, RoomInfo, SharedRooms};
use boxoffice_schedule::{spawn_scheduler, ScheduleConfig, SchedulerMetrics};
use tokio::task::JoinHandle;
use tracing::info;

use crate::{BoxOfficeError, CinemaConfig, ClientActor, ClientStats, Teardown};

/// Builder for configuring and starting a [`Cinema`].
///
/// # Example
///
/// ```rust,no_run
/// use boxoffice::prelude::*;
///
/// # async fn demo() -> Result<(), BoxOfficeError> {
/// let cinema = Cinema::builder().clients(10).start().await?;
/// // ... later, e.g. on Ctrl-C:
/// let report = cinema.shutdown().await?;
/// println!("{} requests handled", report.dispatcher.handled);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CinemaBuilder {
    config: CinemaConfig,
    profiles: Vec<ClientProfile>,
}

impl CinemaBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: CinemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of client actors.
    pub fn clients(mut self, count: usize) -> Self {
        self.config.clients.count = count;
        self
    }

    /// Sets the screening cycle.
    pub fn schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.config.schedule = schedule;
        self
    }

    /// Fixes the first profile of the first `profiles.len()` clients. The
    /// rest, and every later reset, are drawn at random.
    pub fn profiles(mut self, profiles: Vec<ClientProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Validates the configuration and spawns every actor.
    ///
    /// Clients are registered before any of them starts, so no
    /// notification can race a missing registry entry.
    pub async fn start(self) -> Result<Cinema, BoxOfficeError> {
        let config = self.config.validated()?;
        let rooms = SharedRooms::from_specs(&config.rooms)?;
        let registry = ClientRegistry::new();
        let (requests, receiver) = request_channel(config.request_channel_capacity);
        let (trigger, signal) = shutdown_channel();

        let infos = rooms.read().await.infos();
        log_room_table(&infos);

        let dispatcher = spawn_dispatcher(rooms.clone(), registry.clone(), receiver, signal);

        let mut schedulers = Vec::with_capacity(infos.len());
        for info in &infos {
            let handle = spawn_scheduler(
                info.room_id,
                config.schedule,
                rooms.clone(),
                registry.clone(),
                trigger.subscribe(),
            )?;
            schedulers.push((info.room_id, handle));
        }

        let films: Arc<[FilmId]> = config.films().into();
        let mut actors = Vec::with_capacity(config.clients.count);
        for n in 0..config.clients.count {
            let client_id = ClientId(n as u32 + 1);
            let (registry, requests, shutdown) =
                (registry.clone(), requests.clone(), trigger.subscribe());
            let films = Arc::clone(&films);
            let actor = match self.profiles.get(n) {
                Some(&profile) => {
                    ClientActor::register_with_profile(
                        client_id,
                        profile,
                        registry,
                        requests,
                        config.clients,
                        films,
                        shutdown,
                    )
                    .await?
                }
                None => {
                    ClientActor::register(
                        client_id,
                        registry,
                        requests,
                        config.clients,
                        films,
                        shutdown,
                    )
                    .await?
                }
            };
            actors.push(actor);
        }
        let clients = actors.into_iter().map(ClientActor::spawn).collect();

        info!(
            rooms = infos.len(),
            clients = config.clients.count,
            "cinema open"
        );

        Ok(Cinema {
            teardown: Arc::new(Teardown::new(trigger, registry.clone(), rooms.clone())),
            rooms,
            registry,
            requests,
            dispatcher,
            schedulers,
            clients,
        })
    }
}

fn log_room_table(infos: &[RoomInfo]) {
    for room in infos {
        info!(
            room_id = %room.room_id,
            capacity = room.capacity,
            free = room.free_count,
            film_id = %room.film_id,
            min_age = room.min_age,
            "room"
        );
    }
}

/// A running simulation.
pub struct Cinema {
    rooms: SharedRooms,
    registry: ClientRegistry,
    requests: RequestSender,
    teardown: Arc<Teardown>,
    dispatcher: JoinHandle<DispatcherStats>,
    schedulers: Vec<(RoomId, JoinHandle<SchedulerMetrics>)>,
    clients: Vec<JoinHandle<ClientStats>>,
}

/// Final counters of every actor, collected at shutdown.
#[derive(Debug, Clone, Default)]
pub struct CinemaReport {
    pub dispatcher: DispatcherStats,
    pub schedulers: Vec<(RoomId, SchedulerMetrics)>,
    pub clients: Vec<ClientStats>,
}

impl Cinema {
    /// Creates a new builder.
    pub fn builder() -> CinemaBuilder {
        CinemaBuilder::new()
    }

    /// The shared room table.
    pub fn rooms(&self) -> &SharedRooms {
        &self.rooms
    }

    /// The shared client registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The one-shot teardown, for signal handlers that outlive `self`.
    pub fn teardown(&self) -> Arc<Teardown> {
        Arc::clone(&self.teardown)
    }

    /// Tears down (if nobody did yet) and waits for every actor to stop.
    pub async fn shutdown(self) -> Result<CinemaReport, BoxOfficeError> {
        self.teardown.run().await;
        drop(self.requests);

        let dispatcher = self.dispatcher.await?;
        let mut schedulers = Vec::with_capacity(self.schedulers.len());
        for (room_id, handle) in self.schedulers {
            schedulers.push((room_id, handle.await?));
        }
        let mut clients = Vec::with_capacity(self.clients.len());
        for handle in self.clients {
            clients.push(handle.await?);
        }

        info!(
            handled = dispatcher.handled,
            accepted = dispatcher.accepted,
            cycles = schedulers.iter().map(|(_, m)| m.cycles).sum::<u64>(),
            watched = clients.iter().map(|c| c.watched).sum::<u64>(),
            "cinema closed"
        );
        Ok(CinemaReport { dispatcher, schedulers, clients })
    }
}
