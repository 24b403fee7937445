//! Integration tests for the screening clock and the room scheduler.
//!
//! All async tests run with paused, auto-advancing time, so phase sleeps
//! resolve as soon as the runtime is otherwise idle.

use std::time::Duration;

use boxoffice_channel::{notification_channel, shutdown_channel, Inbox};
use boxoffice_protocol::{
    ClientId, FilmId, Notification, ReservationRequest, RoomId, ScreeningEvent, ScreeningKind,
};
use boxoffice_registry::{ClientProfile, ClientRecord, ClientRegistry};
use boxoffice_room::{RoomError, RoomSpec, SharedRooms};
use boxoffice_schedule::{
    spawn_scheduler, Phase, RoomScheduler, ScheduleConfig, ScreeningClock,
};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

const IDLE: Duration = Duration::from_millis(100);
const SCREENING: Duration = Duration::from_millis(200);

fn config() -> ScheduleConfig {
    ScheduleConfig::new(IDLE, SCREENING)
}

async fn register(registry: &ClientRegistry, id: u32) -> Inbox {
    let (tx, inbox) = notification_channel(ClientId(id));
    let profile = ClientProfile { age: 30, film_id: FilmId(101) };
    registry.register(ClientRecord::new(tx, profile)).await.unwrap();
    inbox
}

async fn seat(rooms: &SharedRooms, id: u32) {
    let reply = rooms.write().await.reserve(&ReservationRequest {
        requester_id: ClientId(id),
        desired_film_id: FilmId(101),
        requester_age: 30,
    });
    assert!(reply.reply.is_accepted(), "seat for {id}: {:?}", reply.reply);
}

async fn next_event(inbox: &mut Inbox) -> ScreeningEvent {
    let payload = tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .expect("event should arrive")
        .expect("inbox open");
    match payload.decode().unwrap() {
        Notification::Screening(event) => event,
        other => panic!("expected screening event, got {other:?}"),
    }
}

/// Paused time jumps straight to timer deadlines, which the timer wheel
/// rounds up to the next millisecond.
fn assert_elapsed(since: Instant, expected: Duration) {
    let elapsed = Instant::now() - since;
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(2),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

fn one_room(capacity: usize) -> SharedRooms {
    SharedRooms::from_specs(&[RoomSpec::new(1, capacity, 101, 18)]).unwrap()
}

// =========================================================================
// ScheduleConfig
// =========================================================================

#[test]
fn test_schedule_config_reads_milliseconds() {
    let cfg: ScheduleConfig =
        serde_json::from_str(r#"{"idle_ms": 1500, "screening_ms": 3000}"#).unwrap();

    assert_eq!(cfg.idle, Duration::from_millis(1500));
    assert_eq!(cfg.screening, Duration::from_secs(3));
    assert_eq!(cfg.initial_jitter, ScheduleConfig::default().initial_jitter);
    assert_eq!(cfg.cycle(), Duration::from_millis(4500));
}

// =========================================================================
// ScreeningClock
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_clock_starts_idle_and_alternates() {
    let mut clock = ScreeningClock::new(config());
    assert_eq!(clock.phase(), Phase::Idle);
    let t0 = Instant::now();

    let start = clock.wait_for_change().await;
    assert_eq!(start.phase, Phase::Screening);
    assert_eq!(start.event(), ScreeningKind::Start);
    assert_eq!(start.cycle, 1);
    assert_elapsed(t0, IDLE);

    let end = clock.wait_for_change().await;
    assert_eq!(end.phase, Phase::Idle);
    assert_eq!(end.event(), ScreeningKind::End);
    assert_eq!(end.cycle, 1);
    assert_elapsed(t0, IDLE + SCREENING);

    let again = clock.wait_for_change().await;
    assert_eq!(again.cycle, 2);
    assert_eq!(clock.cycle(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clock_initial_jitter_is_bounded() {
    let jitter = Duration::from_millis(50);
    let mut clock = ScreeningClock::new(ScheduleConfig { initial_jitter: jitter, ..config() });
    let t0 = Instant::now();

    clock.wait_for_change().await;
    let first = Instant::now() - t0;
    assert!(first >= IDLE && first <= IDLE + jitter + Duration::from_millis(2), "first phase took {first:?}");

    // Jitter only applies once.
    let t1 = Instant::now();
    clock.wait_for_change().await;
    assert_elapsed(t1, SCREENING);
}

// =========================================================================
// RoomScheduler
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduler_full_cycle_resets_room() {
    let rooms = one_room(1);
    let registry = ClientRegistry::new();
    let mut a = register(&registry, 1).await;
    seat(&rooms, 1).await;
    let (trigger, signal) = shutdown_channel();

    let task = spawn_scheduler(RoomId(1), config(), rooms.clone(), registry, signal).unwrap();

    let start = next_event(&mut a).await;
    assert_eq!(start, ScreeningEvent { kind: ScreeningKind::Start, room_id: RoomId(1) });
    assert_eq!(rooms.seated(RoomId(1)).await.unwrap(), vec![ClientId(1)]);

    let end = next_event(&mut a).await;
    assert_eq!(end.kind, ScreeningKind::End);
    assert!(rooms.seated(RoomId(1)).await.unwrap().is_empty());
    assert_eq!(rooms.info(RoomId(1)).await.unwrap().free_count, 1);

    trigger.fire();
    let metrics = task.await.unwrap();
    assert_eq!(metrics.cycles, 1);
    assert_eq!(metrics.starts_delivered, 1);
    assert_eq!(metrics.ends_delivered, 1);
    assert_eq!(metrics.dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_reads_occupancy_at_notification_time() {
    let rooms = one_room(5);
    let registry = ClientRegistry::new();
    let mut early = register(&registry, 1).await;
    let mut late = register(&registry, 2).await;
    let (_trigger, signal) = shutdown_channel();
    let _task = spawn_scheduler(RoomId(1), config(), rooms.clone(), registry, signal).unwrap();

    // Seated after the scheduler started, before the screening.
    seat(&rooms, 1).await;
    assert_eq!(next_event(&mut early).await.kind, ScreeningKind::Start);

    // Seated mid-screening: no Start, but the End reaches it.
    seat(&rooms, 2).await;
    assert_eq!(next_event(&mut early).await.kind, ScreeningKind::End);
    assert_eq!(next_event(&mut late).await.kind, ScreeningKind::End);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_empty_room_cycles_quietly() {
    let rooms = one_room(5);
    let (trigger, signal) = shutdown_channel();
    let task =
        spawn_scheduler(RoomId(1), config(), rooms.clone(), ClientRegistry::new(), signal).unwrap();

    tokio::time::sleep(IDLE + SCREENING + Duration::from_millis(10)).await;
    trigger.fire();

    let metrics = task.await.unwrap();
    assert_eq!(metrics.cycles, 1);
    assert_eq!(metrics.starts_delivered + metrics.ends_delivered, 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_exited_client_counts_as_dropped() {
    let rooms = one_room(5);
    let registry = ClientRegistry::new();
    let inbox = register(&registry, 1).await;
    seat(&rooms, 1).await;
    drop(inbox);
    let (trigger, signal) = shutdown_channel();
    let task = spawn_scheduler(RoomId(1), config(), rooms.clone(), registry, signal).unwrap();

    tokio::time::sleep(IDLE + SCREENING + Duration::from_millis(10)).await;
    trigger.fire();

    let metrics = task.await.unwrap();
    assert_eq!(metrics.dropped, 2);
    assert!(rooms.seated(RoomId(1)).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_stops_when_room_removed() {
    let rooms = one_room(5);
    let (_trigger, signal) = shutdown_channel();
    let task =
        spawn_scheduler(RoomId(1), config(), rooms.clone(), ClientRegistry::new(), signal).unwrap();

    rooms.write().await.clear();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("scheduler should stop")
        .unwrap();
}

#[tokio::test]
async fn test_scheduler_rejects_wide_room_id() {
    let (_trigger, signal) = shutdown_channel();
    let result = RoomScheduler::new(
        RoomId(0x1_0000),
        config(),
        one_room(1),
        ClientRegistry::new(),
        signal,
    );
    assert!(matches!(result, Err(RoomError::RoomIdOutOfRange(_))));
}
