//! Per-client notification channels.
//!
//! Every client owns one [`Inbox`]. The matching [`NotificationSender`] is
//! published in the client registry so that the dispatcher (replies) and
//! room schedulers (screening events) can reach the client without sharing
//! any of its state.

use std::time::Duration;

use boxoffice_protocol::{ClientId, Notification, NotificationPayload};
use tokio::sync::mpsc;

use crate::ChannelError;

/// Creates the notification channel for one client.
pub fn notification_channel(client_id: ClientId) -> (NotificationSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        NotificationSender { client_id, tx },
        Inbox { client_id, rx },
    )
}

/// Delivers encoded notifications into one client's inbox.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    client_id: ClientId,
    tx: mpsc::UnboundedSender<NotificationPayload>,
}

impl NotificationSender {
    /// The client this sender delivers to.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Encodes and delivers a notification. Never blocks.
    ///
    /// Fails with [`ChannelError::InboxClosed`] if the client has exited;
    /// callers treat that as a dropped notification, not a fault.
    pub fn notify(&self, notification: impl Into<Notification>) -> Result<(), ChannelError> {
        let payload = notification.into().encode()?;
        tracing::trace!(
            client_id = %self.client_id,
            lane = ?payload.kind,
            value = payload.value,
            "notification queued"
        );
        self.send_payload(payload)
    }

    fn send_payload(&self, payload: NotificationPayload) -> Result<(), ChannelError> {
        self.tx
            .send(payload)
            .map_err(|_| ChannelError::InboxClosed(self.client_id))
    }
}

/// The receiving end of a client's notifications.
#[derive(Debug)]
pub struct Inbox {
    client_id: ClientId,
    rx: mpsc::UnboundedReceiver<NotificationPayload>,
}

impl Inbox {
    /// The client this inbox belongs to.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Blocks until the next payload arrives. `None` once every sender is
    /// gone.
    pub async fn recv(&mut self) -> Option<NotificationPayload> {
        self.rx.recv().await
    }

    /// Like [`recv`](Self::recv) with an upper bound on the wait.
    ///
    /// Returns `Err(elapsed)` on timeout.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<NotificationPayload>, tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, self.rx.recv()).await
    }
}
