use boxoffice_protocol::{ClientId, ProtocolError};

/// Errors that can occur in the channel layer.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The request channel's receiving side is gone (dispatcher stopped
    /// or the channel was torn down).
    #[error("request channel unavailable")]
    Unavailable,

    /// The client's inbox was dropped; the client has exited.
    #[error("inbox of {0} is closed")]
    InboxClosed(ClientId),

    /// The notification could not be encoded for the wire.
    #[error("notification encode failed: {0}")]
    Encode(#[from] ProtocolError),
}
