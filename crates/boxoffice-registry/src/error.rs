//! Error types for the registry layer.

use boxoffice_channel::ChannelError;
use boxoffice_protocol::ClientId;

use crate::ClientStatus;

/// Errors that can occur while accessing the client registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No entry exists for this client. Either the lookup raced a
    /// registration that is not published yet, or the client is gone.
    #[error("client {0} not found in registry")]
    NotFound(ClientId),

    /// An entry with this id already exists.
    #[error("client {0} is already registered")]
    AlreadyRegistered(ClientId),

    /// The requested step is not legal from the client's current state.
    #[error("client {client_id} cannot start a request while {status}")]
    InvalidTransition {
        client_id: ClientId,
        status: ClientStatus,
    },

    /// The entry was found but its inbox could not take the notification.
    #[error(transparent)]
    Delivery(#[from] ChannelError),
}
