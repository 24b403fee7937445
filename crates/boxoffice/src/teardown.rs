//! One-shot teardown of the shared resources.

use std::sync::atomic::{AtomicBool, Ordering};

use boxoffice_channel::ShutdownTrigger;
use boxoffice_registry::ClientRegistry;
use boxoffice_room::SharedRooms;
use tracing::{debug, info};

/// Releases the request channel, the client registry and the room table,
/// exactly once no matter how many times (or from where) it is invoked.
#[derive(Debug)]
pub struct Teardown {
    fired: AtomicBool,
    trigger: ShutdownTrigger,
    registry: ClientRegistry,
    rooms: SharedRooms,
}

impl Teardown {
    pub fn new(trigger: ShutdownTrigger, registry: ClientRegistry, rooms: SharedRooms) -> Self {
        Self {
            fired: AtomicBool::new(false),
            trigger,
            registry,
            rooms,
        }
    }

    /// Returns `true` once teardown has started.
    pub fn is_done(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Stops every actor and releases the shared state.
    ///
    /// Firing the shutdown signal stops the dispatcher, which closes the
    /// request channel. Clearing the registry drops every inbox sender, so
    /// blocked clients wake up and exit. Returns `false` if teardown already
    /// ran.
    pub async fn run(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!("teardown already done");
            return false;
        }

        self.trigger.fire();
        let clients = self.registry.clear().await;
        let rooms = {
            let mut table = self.rooms.write().await;
            let count = table.len();
            table.clear();
            count
        };

        info!(clients, rooms, "teardown complete");
        true
    }
}
