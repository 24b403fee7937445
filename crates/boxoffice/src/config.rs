//! Cinema configuration.
//!
//! Everything is optional on disk: a missing field takes its default, and
//! an empty file (`{}`) describes the stock four-room cinema. Durations are
//! integer milliseconds.
//!
//! ```json
//! {
//!   "rooms": [{ "room_id": 1, "capacity": 1, "film_id": 101, "min_age": 18 }],
//!   "clients": { "count": 5, "arrival_min_ms": 5000, "arrival_max_ms": 10000 },
//!   "schedule": { "idle_ms": 20000, "screening_ms": 30000 }
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use boxoffice_channel::DEFAULT_REQUEST_CAPACITY;
use boxoffice_protocol::FilmId;
use boxoffice_room::RoomSpec;
use boxoffice_schedule::{millis, ScheduleConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CinemaConfig {
    /// Rooms, in the order the dispatcher scans them.
    pub rooms: Vec<RoomSpec>,

    pub clients: ClientConfig,

    /// Screening cycle, shared by every room.
    pub schedule: ScheduleConfig,

    /// Slots in the request channel before clients wait to submit.
    pub request_channel_capacity: usize,

    /// Append-only log file. `None` logs to stderr only.
    pub log_file: Option<PathBuf>,
}

impl Default for CinemaConfig {
    fn default() -> Self {
        Self {
            rooms: vec![
                RoomSpec::new(1, 100, 101, 0),
                RoomSpec::new(2, 150, 102, 12),
                RoomSpec::new(3, 200, 103, 16),
                RoomSpec::new(4, 250, 104, 18),
            ],
            clients: ClientConfig::default(),
            schedule: ScheduleConfig::default(),
            request_channel_capacity: DEFAULT_REQUEST_CAPACITY,
            log_file: None,
        }
    }
}

impl CinemaConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks cross-field consistency.
    ///
    /// Rejects an empty room list, duplicate room ids, a film shown in two
    /// rooms, room ids wider than 16 bits, and an inverted arrival range.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.rooms.is_empty() {
            return Err(ConfigError::NoRooms);
        }
        let mut ids = HashSet::new();
        let mut films = HashSet::new();
        for room in &self.rooms {
            if !room.room_id.fits_wire() {
                return Err(ConfigError::RoomIdOutOfRange(room.room_id));
            }
            if !ids.insert(room.room_id) {
                return Err(ConfigError::DuplicateRoom(room.room_id));
            }
            if !films.insert(room.film_id) {
                return Err(ConfigError::DuplicateFilm(room.film_id));
            }
        }
        if self.clients.arrival_min > self.clients.arrival_max {
            return Err(ConfigError::ArrivalRange {
                min: self.clients.arrival_min,
                max: self.clients.arrival_max,
            });
        }
        Ok(self)
    }

    /// The film catalog clients draw from.
    pub fn films(&self) -> Vec<FilmId> {
        self.rooms.iter().map(|r| r.film_id).collect()
    }
}

/// How client actors behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Number of client actors.
    pub count: usize,

    /// Lower bound of the random pause before each request.
    #[serde(rename = "arrival_min_ms", with = "millis")]
    pub arrival_min: Duration,

    /// Upper bound (inclusive) of the random pause before each request.
    #[serde(rename = "arrival_max_ms", with = "millis")]
    pub arrival_max: Duration,

    /// Give up waiting for a reply after this long. `None` waits forever.
    #[serde(rename = "reply_timeout_ms", with = "opt_millis")]
    pub reply_timeout: Option<Duration>,

    /// Give up waiting for a screening event after this long.
    #[serde(rename = "screening_timeout_ms", with = "opt_millis")]
    pub screening_timeout: Option<Duration>,

    /// Ages are drawn from `0..max_age`.
    pub max_age: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            count: 5,
            arrival_min: Duration::from_secs(5),
            arrival_max: Duration::from_secs(10),
            reply_timeout: None,
            screening_timeout: None,
            max_age: 100,
        }
    }
}

/// `Option<Duration>` as integer milliseconds or `null`.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
