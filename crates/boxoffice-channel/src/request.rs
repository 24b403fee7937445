//! The request channel: many clients, one dispatcher.

use boxoffice_protocol::{RequestRecord, ReservationRequest};
use tokio::sync::mpsc;

use crate::ChannelError;

/// Default number of in-flight records before senders wait.
pub const DEFAULT_REQUEST_CAPACITY: usize = 128;

/// Creates a bounded request channel.
///
/// `capacity` controls backpressure: once it is reached, [`RequestSender::send`]
/// waits for a free slot. It never waits for the dispatcher to *process* the
/// request.
pub fn request_channel(capacity: usize) -> (RequestSender, RequestReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RequestSender { tx }, RequestReceiver { rx })
}

/// Producer side of the request channel. Cheap to clone, one per client.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: mpsc::Sender<RequestRecord>,
}

impl RequestSender {
    /// Submits a reservation request, waiting for channel capacity.
    pub async fn send(&self, request: ReservationRequest) -> Result<(), ChannelError> {
        self.tx
            .send(RequestRecord::from(request))
            .await
            .map_err(|_| ChannelError::Unavailable)
    }
}

/// Consumer side of the request channel. Owned by the dispatcher.
#[derive(Debug)]
pub struct RequestReceiver {
    rx: mpsc::Receiver<RequestRecord>,
}

impl RequestReceiver {
    /// Waits for the next record. Returns `None` once every sender is gone
    /// or the channel was closed and drained.
    pub async fn recv(&mut self) -> Option<RequestRecord> {
        self.rx.recv().await
    }

    /// Stops accepting new records. Records already queued can still be
    /// received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_protocol::{ClientId, FilmId, REQUEST_KIND};

    use super::*;

    fn request(id: u32) -> ReservationRequest {
        ReservationRequest {
            requester_id: ClientId(id),
            desired_film_id: FilmId(101),
            requester_age: 30,
        }
    }

    #[tokio::test]
    async fn test_send_delivers_tagged_record() {
        let (tx, mut rx) = request_channel(4);
        tx.send(request(1)).await.unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.kind, REQUEST_KIND);
        assert_eq!(record.requester_id, ClientId(1));
    }

    #[tokio::test]
    async fn test_send_after_close_returns_unavailable() {
        let (tx, mut rx) = request_channel(4);
        rx.close();

        let result = tx.send(request(1)).await;
        assert!(matches!(result, Err(ChannelError::Unavailable)));
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_all_senders_dropped() {
        let (tx, mut rx) = request_channel(4);
        let tx2 = tx.clone();
        tx2.send(request(2)).await.unwrap();
        drop(tx);
        drop(tx2);

        assert!(rx.recv().await.is_some(), "queued record survives");
        assert!(rx.recv().await.is_none());
    }
}
