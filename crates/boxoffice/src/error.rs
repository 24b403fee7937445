//! Error types for the boxoffice meta-crate.

use std::path::PathBuf;
use std::time::Duration;

use boxoffice_channel::ChannelError;
use boxoffice_protocol::{ClientId, FilmId, ProtocolError, RoomId};
use boxoffice_registry::RegistryError;
use boxoffice_room::RoomError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BoxOfficeError {
    /// A channel error (request channel gone, inbox closed).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A wire encoding error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A client registry error (unknown client, illegal step).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A room table error (unknown room, bad room configuration).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A client actor error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An actor task panicked or was cancelled.
    #[error("actor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors raised inside a client actor's cycle.
///
/// All of them are recoverable: the client logs, resets and tries again on
/// its next cycle, except when its registry entry is gone.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No notification arrived within the configured wait.
    #[error("client {client_id} timed out after {after:?}")]
    Timeout { client_id: ClientId, after: Duration },

    /// The film catalog is empty, so no profile can be drawn.
    #[error("no films to choose from")]
    NoFilms,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors found while loading or validating a [`CinemaConfig`](crate::CinemaConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("at least one room must be configured")]
    NoRooms,

    #[error("room {0} is configured twice")]
    DuplicateRoom(RoomId),

    #[error("film {0} is shown in more than one room")]
    DuplicateFilm(FilmId),

    #[error("room id {0} does not fit the notification payload")]
    RoomIdOutOfRange(RoomId),

    #[error("arrival_min ({min:?}) exceeds arrival_max ({max:?})")]
    ArrivalRange { min: Duration, max: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_channel_error() {
        let err: BoxOfficeError = ChannelError::Unavailable.into();
        assert!(matches!(err, BoxOfficeError::Channel(_)));
        assert_eq!(err.to_string(), "request channel unavailable");
    }

    #[test]
    fn test_from_room_error() {
        let err: BoxOfficeError = RoomError::NotFound(RoomId(1)).into();
        assert!(matches!(err, BoxOfficeError::Room(_)));
        assert!(err.to_string().contains("R-1"));
    }

    #[test]
    fn test_from_registry_error() {
        let err: BoxOfficeError = RegistryError::NotFound(ClientId(4)).into();
        assert!(matches!(err, BoxOfficeError::Registry(_)));
    }

    #[test]
    fn test_client_error_wraps_registry_error() {
        let err: ClientError = RegistryError::NotFound(ClientId(4)).into();
        let top: BoxOfficeError = err.into();
        assert!(matches!(top, BoxOfficeError::Client(ClientError::Registry(_))));
        assert!(top.to_string().contains("C-4"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ArrivalRange {
            min: Duration::from_secs(9),
            max: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("arrival_min"));
    }
}
