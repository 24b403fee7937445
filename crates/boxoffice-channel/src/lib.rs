//! Channel layer for boxoffice.
//!
//! Two kinds of delivery path connect the cinema's actors:
//!
//! - the **request channel** ([`request_channel`]): bounded, many producers
//!   (clients), one consumer (the dispatcher). No ordering across producers.
//! - the **notification channels** ([`notification_channel`]): one per
//!   client, fed by whoever has something to tell that client.
//!
//! Both ends are plain Tokio mpsc channels; this crate adds the wire
//! encoding and maps failures onto [`ChannelError`]. A third, tiny channel
//! ([`shutdown_channel`]) tells every actor when to stop.

mod error;
mod notify;
mod request;
mod shutdown;

pub use error::ChannelError;
pub use notify::{notification_channel, Inbox, NotificationSender};
pub use request::{request_channel, RequestReceiver, RequestSender, DEFAULT_REQUEST_CAPACITY};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
