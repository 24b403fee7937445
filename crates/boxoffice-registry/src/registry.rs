//! The client registry: every client's state, behind one lock.
//!
//! The registry is reached by more than one actor. A client writes its own
//! entry when it submits a request or resets; the dispatcher and the room
//! schedulers look entries up to find the inbox a notification belongs to.
//! Every access, read or write, goes through the same mutex and holds it
//! only for the duration of one closure, which cannot `.await`, so the lock
//! is never held across a blocking wait.

use std::collections::HashMap;
use std::sync::Arc;

use boxoffice_channel::NotificationSender;
use boxoffice_protocol::{ClientId, Notification};
use tokio::sync::Mutex;

use crate::{ClientRecord, RegistryError};

/// Shared map from client identity to client state.
///
/// Cheap to clone: every clone refers to the same entries.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<ClientId, ClientRecord>>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a client's entry.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyRegistered`] if the id is taken.
    pub async fn register(&self, record: ClientRecord) -> Result<(), RegistryError> {
        let mut clients = self.clients.lock().await;
        let client_id = record.client_id;
        if clients.contains_key(&client_id) {
            return Err(RegistryError::AlreadyRegistered(client_id));
        }
        clients.insert(client_id, record);
        tracing::debug!(%client_id, "client registered");
        Ok(())
    }

    /// Runs `f` on the client's entry under exclusive access.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if no entry exists for `client_id`. This
    /// can happen when a lookup races a registration that has not been
    /// published yet, or after teardown.
    pub async fn with_client_mut<R>(
        &self,
        client_id: ClientId,
        f: impl FnOnce(&mut ClientRecord) -> R,
    ) -> Result<R, RegistryError> {
        let mut clients = self.clients.lock().await;
        let record = clients
            .get_mut(&client_id)
            .ok_or(RegistryError::NotFound(client_id))?;
        Ok(f(record))
    }

    /// Read-only variant of [`with_client_mut`](Self::with_client_mut).
    /// Takes the same lock.
    pub async fn with_client<R>(
        &self,
        client_id: ClientId,
        f: impl FnOnce(&ClientRecord) -> R,
    ) -> Result<R, RegistryError> {
        self.with_client_mut(client_id, |record| f(record)).await
    }

    /// Resolves the inbox handle for `client_id`.
    pub async fn inbox_of(&self, client_id: ClientId) -> Result<NotificationSender, RegistryError> {
        self.with_client(client_id, |record| record.inbox.clone()).await
    }

    /// Resolves the client's inbox and delivers `notification` to it.
    ///
    /// The lock is released before the notification is sent.
    pub async fn deliver(
        &self,
        client_id: ClientId,
        notification: impl Into<Notification>,
    ) -> Result<(), RegistryError> {
        let inbox = self.inbox_of(client_id).await?;
        inbox.notify(notification)?;
        Ok(())
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Returns `true` if no client is registered.
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Removes every entry and returns how many there were.
    ///
    /// Dropping the entries drops their inbox senders, so clients blocked
    /// on an empty inbox wake up with `None`.
    pub async fn clear(&self) -> usize {
        let mut clients = self.clients.lock().await;
        let count = clients.len();
        clients.clear();
        count
    }
}
