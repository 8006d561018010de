//! Lobby configuration and the per-room state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::world::IsolationMode;

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Configuration for the lobby coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Entity template spawned for a connection when it enters a room,
    /// replacing whatever it controlled before.
    pub room_entity_template: String,

    /// Isolation applied to every room's world instance.
    pub isolation: IsolationMode,

    /// Deadline for a world host to produce a world. An attempt whose
    /// load outlives this is failed and cleaned up; nothing in the
    /// registry is left behind.
    pub world_load_timeout: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            room_entity_template: "room-player".to_string(),
            isolation: IsolationMode::Shared,
            world_load_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a registered room.
///
/// ```text
/// Open → Unloading → (unregistered)
/// ```
///
/// - **Open**: the room accepts joins while it has free slots. A room is
///   Open from the moment it is registered, including the window before
///   its creator is bound into it.
/// - **Unloading**: the last occupant left and the world instance is being
///   released. The room is still registered, so its name stays reserved
///   until the world is gone, but it no longer accepts joins and is
///   excluded from listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Open,
    Unloading,
}

impl RoomState {
    /// Returns `true` if the room can accept new occupants.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Unloading => write!(f, "Unloading"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_is_joinable() {
        assert!(RoomState::Open.is_joinable());
        assert!(!RoomState::Unloading.is_joinable());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::Open.to_string(), "Open");
        assert_eq!(RoomState::Unloading.to_string(), "Unloading");
    }

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.room_entity_template, "room-player");
        assert_eq!(config.isolation, IsolationMode::Shared);
        assert_eq!(config.world_load_timeout, Duration::from_secs(30));
    }
}
