//! Integration tests for the dispatcher actor.

use std::time::Duration;

use boxoffice_channel::{
    notification_channel, request_channel, shutdown_channel, Inbox, RequestSender,
};
use boxoffice_protocol::{
    ClientId, FilmId, Notification, RequestRecord, ReservationReply, ReservationRequest, RoomId,
};
use boxoffice_registry::{ClientProfile, ClientRegistry, ClientRecord};
use boxoffice_room::{spawn_dispatcher, Dispatcher, RoomSpec, SharedRooms};

// =========================================================================
// Helpers
// =========================================================================

fn request(client: u32, film: u32, age: u8) -> ReservationRequest {
    ReservationRequest {
        requester_id: ClientId(client),
        desired_film_id: FilmId(film),
        requester_age: age,
    }
}

async fn register(registry: &ClientRegistry, id: u32) -> Inbox {
    let (tx, inbox) = notification_channel(ClientId(id));
    let profile = ClientProfile { age: 30, film_id: FilmId(101) };
    registry.register(ClientRecord::new(tx, profile)).await.unwrap();
    inbox
}

async fn next_reply(inbox: &mut Inbox) -> ReservationReply {
    let payload = tokio::time::timeout(Duration::from_secs(1), inbox.recv())
        .await
        .expect("reply should arrive")
        .expect("inbox open");
    match payload.decode().unwrap() {
        Notification::Reply(reply) => reply,
        other => panic!("expected reply, got {other:?}"),
    }
}

struct Harness {
    rooms: SharedRooms,
    registry: ClientRegistry,
    requests: RequestSender,
    trigger: boxoffice_channel::ShutdownTrigger,
    task: tokio::task::JoinHandle<boxoffice_room::DispatcherStats>,
}

fn start(specs: &[RoomSpec]) -> Harness {
    let rooms = SharedRooms::from_specs(specs).unwrap();
    let registry = ClientRegistry::new();
    let (requests, rx) = request_channel(16);
    let (trigger, signal) = shutdown_channel();
    let task = spawn_dispatcher(rooms.clone(), registry.clone(), rx, signal);
    Harness { rooms, registry, requests, trigger, task }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_dispatcher_accepts_then_rejects_full_room() {
    let h = start(&[RoomSpec::new(1, 1, 101, 0)]);
    let mut a = register(&h.registry, 1).await;
    let mut b = register(&h.registry, 2).await;

    h.requests.send(request(1, 101, 20)).await.unwrap();
    assert_eq!(next_reply(&mut a).await, ReservationReply::Accepted(RoomId(1)));

    h.requests.send(request(2, 101, 20)).await.unwrap();
    assert_eq!(next_reply(&mut b).await, ReservationReply::RejectedRoomFull);

    let room = h.rooms.info(RoomId(1)).await.unwrap();
    assert_eq!(room.free_count, 0);
    assert_eq!(h.rooms.seated(RoomId(1)).await.unwrap(), vec![ClientId(1)]);

    h.trigger.fire();
    let stats = h.task.await.unwrap();
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.rejected_full, 1);
    assert_eq!(stats.handled, 2);
}

#[tokio::test]
async fn test_dispatcher_rejects_underage_without_touching_room() {
    let h = start(&[RoomSpec::new(1, 5, 101, 18)]);
    let mut inbox = register(&h.registry, 1).await;

    h.requests.send(request(1, 101, 17)).await.unwrap();

    assert_eq!(next_reply(&mut inbox).await, ReservationReply::RejectedAgeRestricted);
    assert_eq!(h.rooms.info(RoomId(1)).await.unwrap().free_count, 5);
    h.trigger.fire();
}

#[tokio::test]
async fn test_dispatcher_unknown_film_replies_no_such_film() {
    let h = start(&[RoomSpec::new(1, 5, 101, 0)]);
    let mut inbox = register(&h.registry, 1).await;

    h.requests.send(request(1, 555, 30)).await.unwrap();

    assert_eq!(next_reply(&mut inbox).await, ReservationReply::RejectedNoSuchFilm);
    h.trigger.fire();
    assert_eq!(h.task.await.unwrap().rejected_no_film, 1);
}

#[tokio::test]
async fn test_dispatcher_never_oversells_under_contention() {
    let capacity = 3;
    let h = start(&[RoomSpec::new(1, capacity, 101, 0)]);
    let mut inboxes = Vec::new();
    for id in 1..=10 {
        inboxes.push(register(&h.registry, id).await);
    }

    let mut senders = Vec::new();
    for id in 1..=10 {
        let tx = h.requests.clone();
        senders.push(tokio::spawn(async move { tx.send(request(id, 101, 30)).await }));
    }
    for s in senders {
        s.await.unwrap().unwrap();
    }

    let mut accepted = 0;
    for inbox in &mut inboxes {
        if next_reply(inbox).await.is_accepted() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, capacity);
    let seated = h.rooms.seated(RoomId(1)).await.unwrap();
    assert_eq!(seated.len(), capacity);
    h.rooms.read().await.check_invariants().unwrap();
    h.trigger.fire();
}

#[tokio::test]
async fn test_dispatcher_drops_foreign_record_kind() {
    let rooms = SharedRooms::from_specs(&[RoomSpec::new(1, 5, 101, 0)]).unwrap();
    let registry = ClientRegistry::new();
    let mut inbox = register(&registry, 1).await;
    let (_tx, rx) = request_channel(4);
    let (_trigger, signal) = shutdown_channel();
    let mut dispatcher = Dispatcher::new(rooms.clone(), registry, rx, signal);

    let mut record = RequestRecord::from(request(1, 101, 30));
    record.kind = 9;

    assert_eq!(dispatcher.handle(record).await, None);
    assert_eq!(dispatcher.stats().malformed, 1);
    assert!(rooms.seated(RoomId(1)).await.unwrap().is_empty());
    assert!(inbox.recv_timeout(Duration::from_millis(20)).await.is_err());
}

#[tokio::test]
async fn test_dispatcher_unknown_requester_gets_seat_back() {
    let rooms = SharedRooms::from_specs(&[RoomSpec::new(1, 5, 101, 0)]).unwrap();
    let (_tx, rx) = request_channel(4);
    let (_trigger, signal) = shutdown_channel();
    let mut dispatcher = Dispatcher::new(rooms.clone(), ClientRegistry::new(), rx, signal);

    let reply = dispatcher.handle(RequestRecord::from(request(9, 101, 30))).await;

    assert_eq!(reply, Some(ReservationReply::Accepted(RoomId(1))));
    assert_eq!(dispatcher.stats().undelivered, 1);
    assert!(rooms.seated(RoomId(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatcher_stops_when_senders_dropped() {
    let h = start(&[RoomSpec::new(1, 5, 101, 0)]);
    let Harness { requests, task, trigger: _trigger, .. } = h;
    drop(requests);

    let stats = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("dispatcher should stop")
        .unwrap();
    assert_eq!(stats.handled, 0);
}

#[tokio::test]
async fn test_dispatcher_stops_on_shutdown_and_closes_channel() {
    let h = start(&[RoomSpec::new(1, 5, 101, 0)]);

    h.trigger.fire();
    tokio::time::timeout(Duration::from_secs(1), h.task)
        .await
        .expect("dispatcher should stop")
        .unwrap();

    assert!(h.requests.send(request(1, 101, 30)).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispatcher_reply_queued_before_room_can_drain() {
    let rooms = SharedRooms::from_specs(&[RoomSpec::new(1, 5, 101, 0)]).unwrap();
    let registry = ClientRegistry::new();
    let mut inbox = register(&registry, 1).await;
    let _other = register(&registry, 2).await;
    let (_tx, rx) = request_channel(4);
    let (_trigger, signal) = shutdown_channel();
    let mut dispatcher = Dispatcher::new(rooms.clone(), registry.clone(), rx, signal);

    // Hold the registry lock so the reply cannot go out yet.
    let (held_tx, held_rx) = std::sync::mpsc::channel::<()>();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let blocker = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .with_client_mut(ClientId(2), move |_| {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .await
                .unwrap();
        })
    };
    tokio::task::spawn_blocking(move || held_rx.recv().unwrap()).await.unwrap();

    let handled = tokio::spawn(async move {
        dispatcher.handle(RequestRecord::from(request(1, 101, 30))).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A screening end racing the pending reply.
    let drain = {
        let rooms = rooms.clone();
        tokio::spawn(async move { rooms.drain(RoomId(1)).await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!drain.is_finished(), "room drained before the seat holder was told");

    release_tx.send(()).unwrap();
    blocker.await.unwrap();
    assert_eq!(handled.await.unwrap(), Some(ReservationReply::Accepted(RoomId(1))));
    assert_eq!(drain.await.unwrap(), vec![ClientId(1)]);
    assert_eq!(next_reply(&mut inbox).await, ReservationReply::Accepted(RoomId(1)));
}
