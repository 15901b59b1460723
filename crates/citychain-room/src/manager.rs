//! Room manager: owns the fixed set of rooms and routes lookups by name.

use citychain_protocol::ROOM_NAMES;
use citychain_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// The rooms a server offers.
///
/// Rooms are created once and live as long as the manager. No lock is
/// needed: the room list never changes and every handle is `Clone`.
/// Which room a player is in is tracked by that player's connection task,
/// not here.
#[derive(Clone, Debug)]
pub struct RoomManager {
    /// Room handles in the order clients display them.
    rooms: Vec<RoomHandle>,
}

impl RoomManager {
    /// Spawns one room actor per name, in the given order.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new<S: AsRef<str>>(names: &[S], config: RoomConfig) -> Self {
        let rooms = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                tracing::info!(room = name, "room created");
                spawn_room(name, config.clone(), DEFAULT_CHANNEL_SIZE)
            })
            .collect();
        Self { rooms }
    }

    /// Spawns the five standard rooms.
    pub fn with_default_rooms(config: RoomConfig) -> Self {
        Self::new(&ROOM_NAMES, config)
    }

    /// Looks a room up by exact name.
    ///
    /// # Errors
    /// Returns [`RoomError::RoomNotFound`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<&RoomHandle, RoomError> {
        self.rooms
            .iter()
            .find(|room| room.name() == name)
            .ok_or_else(|| RoomError::RoomNotFound(name.to_string()))
    }

    /// Member count of every room, in room order.
    ///
    /// A room that fails to answer counts as empty.
    pub async fn occupancy(&self) -> Vec<usize> {
        let mut counts = Vec::with_capacity(self.rooms.len());
        for room in &self.rooms {
            let count = room.get_info().await.map_or(0, |info| info.player_count);
            counts.push(count);
        }
        counts
    }

    /// Clears any bans held against a departing connection.
    pub async fn forget(&self, conn_id: ConnectionId) {
        for room in &self.rooms {
            if let Err(e) = room.forget(conn_id).await {
                tracing::warn!(%conn_id, error = %e, "failed to clear ban");
            }
        }
    }

    /// Room names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.rooms.iter().map(|room| room.name()).collect()
    }

    /// Returns the number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if the manager holds no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
