//! The client actor: one customer's reservation lifecycle as a Tokio task.
//!
//! ```text
//! loop {
//!     sleep(random arrival delay)
//!     submit request                      FREE → AWAITING_CONFIRMATION
//!     await reply       ─(rejected)─▶ reset
//!     await Start                         CONFIRMED_WAITING → WATCHING
//!     await End                           WATCHING → FREE, reset
//! }
//! ```
//!
//! State lives in the client's [`ClientRecord`], reached only through the
//! [`ClientRegistry`]. Every wait blocks on the inbox (optionally bounded
//! by a timeout) and races the shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use boxoffice_channel::{notification_channel, Inbox, RequestSender, ShutdownSignal};
use boxoffice_protocol::{ClientId, FilmId, Notification, ReservationReply};
use boxoffice_registry::{
    ClientProfile, ClientRecord, ClientRegistry, IgnoreReason, RegistryError, Transition,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{ClientConfig, ClientError};

/// Counters kept by a client over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Requests submitted.
    pub requests: u64,
    /// Screenings watched to the end.
    pub watched: u64,
    /// Rejections received.
    pub rejected: u64,
    /// Screenings that ended before this client saw them start.
    pub missed: u64,
    /// Waits that ran out.
    pub timeouts: u64,
    /// Notifications that did not apply (mismatch, late, undecodable).
    pub ignored: u64,
}

/// How a cycle ended.
enum CycleEnd {
    /// Back to FREE; go around again.
    Reset,
    /// Shutdown fired, or the inbox or registry entry is gone.
    Stop,
}

/// What the client is blocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiting {
    Reply,
    Screening,
}

/// One client actor. Create with [`ClientActor::register`], then
/// [`spawn`](Self::spawn) or [`run`](Self::run).
pub struct ClientActor {
    client_id: ClientId,
    inbox: Inbox,
    registry: ClientRegistry,
    requests: RequestSender,
    config: ClientConfig,
    films: Arc<[FilmId]>,
    shutdown: ShutdownSignal,
    stats: ClientStats,
}

impl ClientActor {
    /// Creates the client with a random profile and publishes its record.
    ///
    /// # Errors
    /// - [`ClientError::NoFilms`] if `films` is empty
    /// - [`ClientError::Registry`] if `client_id` is already registered
    pub async fn register(
        client_id: ClientId,
        registry: ClientRegistry,
        requests: RequestSender,
        config: ClientConfig,
        films: Arc<[FilmId]>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ClientError> {
        let profile = ClientProfile::random(&films, config.max_age).ok_or(ClientError::NoFilms)?;
        Self::register_with_profile(client_id, profile, registry, requests, config, films, shutdown)
            .await
    }

    /// Like [`register`](Self::register) with a chosen first profile.
    /// Later resets are still random.
    pub async fn register_with_profile(
        client_id: ClientId,
        profile: ClientProfile,
        registry: ClientRegistry,
        requests: RequestSender,
        config: ClientConfig,
        films: Arc<[FilmId]>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ClientError> {
        let (sender, inbox) = notification_channel(client_id);
        registry.register(ClientRecord::new(sender, profile)).await?;
        info!(
            %client_id,
            age = profile.age,
            film_id = %profile.film_id,
            "client created"
        );
        Ok(Self {
            client_id,
            inbox,
            registry,
            requests,
            config,
            films,
            shutdown,
            stats: ClientStats::default(),
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Spawns [`run`](Self::run) on the runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<ClientStats> {
        tokio::spawn(self.run())
    }

    /// Cycles until shutdown, or until the registry entry or inbox is gone.
    pub async fn run(mut self) -> ClientStats {
        loop {
            let delay = self.arrival_delay();
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.cycle().await {
                Ok(CycleEnd::Reset) => {}
                Ok(CycleEnd::Stop) => break,
                Err(ClientError::Registry(RegistryError::NotFound(_))) => {
                    debug!(client_id = %self.client_id, "registry entry gone");
                    break;
                }
                Err(e) => {
                    if let ClientError::Timeout { .. } = e {
                        self.stats.timeouts += 1;
                    }
                    warn!(client_id = %self.client_id, error = %e, "cycle aborted");
                    if self.shutdown.is_fired() {
                        break;
                    }
                    if let Err(e) = self.reset().await {
                        debug!(client_id = %self.client_id, error = %e, "reset failed");
                        break;
                    }
                }
            }
        }

        debug!(client_id = %self.client_id, stats = ?self.stats, "client stopped");
        self.stats
    }

    fn arrival_delay(&self) -> Duration {
        let min = self.config.arrival_min;
        let max = self.config.arrival_max.max(min);
        if min == max {
            return min;
        }
        rand::rng().random_range(min..=max)
    }

    /// One reservation cycle, from FREE back to FREE.
    async fn cycle(&mut self) -> Result<CycleEnd, ClientError> {
        let request = self
            .registry
            .with_client_mut(self.client_id, ClientRecord::begin_request)
            .await??;

        info!(
            client_id = %self.client_id,
            film_id = %request.desired_film_id,
            age = request.requester_age,
            "requesting a seat"
        );
        self.requests.send(request).await?;
        self.stats.requests += 1;

        let mut waiting = Waiting::Reply;
        loop {
            let Some(notification) = self.next_notification(waiting).await? else {
                return Ok(CycleEnd::Stop);
            };
            let transition = self
                .registry
                .with_client_mut(self.client_id, |record| record.apply(notification))
                .await?;
            self.log_transition(transition);

            if let Transition::Confirmed(_) = transition {
                waiting = Waiting::Screening;
            }
            if transition.needs_reset() {
                self.reset().await?;
                return Ok(CycleEnd::Reset);
            }
        }
    }

    /// Blocks for the next decodable notification.
    ///
    /// `Ok(None)` means stop: shutdown fired or every sender is gone.
    async fn next_notification(
        &mut self,
        waiting: Waiting,
    ) -> Result<Option<Notification>, ClientError> {
        let limit = match waiting {
            Waiting::Reply => self.config.reply_timeout,
            Waiting::Screening => self.config.screening_timeout,
        };

        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.wait() => return Ok(None),
                received = recv(&mut self.inbox, limit) => received,
            };
            let payload = match received {
                Ok(Some(payload)) => payload,
                Ok(None) => return Ok(None),
                Err(after) => {
                    return Err(ClientError::Timeout { client_id: self.client_id, after });
                }
            };
            match payload.decode() {
                Ok(notification) => return Ok(Some(notification)),
                Err(e) => {
                    self.stats.ignored += 1;
                    warn!(
                        client_id = %self.client_id,
                        value = payload.value,
                        error = %e,
                        "undecodable notification discarded"
                    );
                }
            }
        }
    }

    /// Draws a fresh profile and returns the record to FREE.
    async fn reset(&mut self) -> Result<(), ClientError> {
        let profile =
            ClientProfile::random(&self.films, self.config.max_age).ok_or(ClientError::NoFilms)?;
        self.registry
            .with_client_mut(self.client_id, |record| record.reset(profile))
            .await?;
        info!(
            client_id = %self.client_id,
            age = profile.age,
            film_id = %profile.film_id,
            "client reset"
        );
        Ok(())
    }

    fn log_transition(&mut self, transition: Transition) {
        let client_id = self.client_id;
        match transition {
            Transition::Confirmed(room_id) => {
                info!(%client_id, %room_id, "seat reserved, waiting for the film")
            }
            Transition::Rejected(reply) => {
                self.stats.rejected += 1;
                match reply {
                    ReservationReply::RejectedAgeRestricted => {
                        info!(%client_id, "too young for this film")
                    }
                    ReservationReply::RejectedRoomFull => info!(%client_id, "room full"),
                    ReservationReply::RejectedNoSuchFilm => {
                        info!(%client_id, "film not showing")
                    }
                    ReservationReply::Accepted(_) => {}
                }
            }
            Transition::Started(room_id) => info!(%client_id, %room_id, "screening start received"),
            Transition::Finished(room_id) => {
                self.stats.watched += 1;
                info!(%client_id, %room_id, "screening end received")
            }
            Transition::Missed(room_id) => {
                self.stats.missed += 1;
                info!(%client_id, %room_id, "screening ended before it started for this client")
            }
            Transition::Ignored(IgnoreReason::RoomMismatch { expected, received }) => {
                self.stats.ignored += 1;
                warn!(
                    %client_id,
                    expected = ?expected,
                    %received,
                    "notification for another room ignored"
                )
            }
            Transition::Ignored(IgnoreReason::Unexpected(status)) => {
                self.stats.ignored += 1;
                warn!(%client_id, %status, "unexpected notification ignored")
            }
        }
    }
}

/// Receives with an optional upper bound. `Err` carries the bound that ran
/// out.
async fn recv(
    inbox: &mut Inbox,
    limit: Option<Duration>,
) -> Result<Option<boxoffice_protocol::NotificationPayload>, Duration> {
    match limit {
        Some(limit) => inbox.recv_timeout(limit).await.map_err(|_| limit),
        None => Ok(inbox.recv().await),
    }
}
