//! Engine-side collaborator contracts.
//!
//! The lobby coordinator does not host worlds or spawn entities — a game
//! engine does. These traits are the seam: [`WorldHost`] allocates and
//! releases isolated world instances and moves entities between them,
//! [`EntityHost`] swaps the entity a connection controls. The lifecycle
//! layer calls them and otherwise treats worlds and entities as opaque
//! handles.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use parlor_transport::ConnectionId;

/// Handle to an isolated world instance, minted by the [`WorldHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldHandle(pub u64);

impl fmt::Display for WorldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Handle to a spawned entity, minted by the [`EntityHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// How strongly a room's world is isolated from the others.
///
/// `Shared` keeps all rooms in the host's default simulation; the physics
/// variants give each room its own physics scene so nothing bleeds across
/// room boundaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum IsolationMode {
    #[default]
    Shared,
    Physics2D,
    Physics3D,
}

/// Errors reported by a world host.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The host could not load the requested template.
    #[error("failed to load world from template '{template}': {reason}")]
    LoadFailed { template: String, reason: String },

    /// The host did not produce a world within the configured deadline.
    #[error("world load from template '{0}' timed out")]
    LoadTimedOut(String),

    /// Releasing a world instance failed.
    #[error("failed to unload {world}: {reason}")]
    UnloadFailed { world: WorldHandle, reason: String },
}

/// Allocates and releases isolated world instances.
///
/// Loading and unloading suspend (a world may take many scheduling turns
/// to come up), so both return futures. The futures are `Send` because the
/// lifecycle awaits them from per-connection tasks that migrate across the
/// runtime's threads. Moving an entity is an immediate, server-authoritative
/// operation.
pub trait WorldHost: Send + Sync + 'static {
    /// Asynchronously loads an isolated world instance from a template.
    fn load_world(
        &self,
        template: &str,
        isolation: IsolationMode,
    ) -> impl Future<Output = Result<WorldHandle, WorldError>> + Send;

    /// Asynchronously releases a world instance.
    fn unload_world(
        &self,
        world: WorldHandle,
    ) -> impl Future<Output = Result<(), WorldError>> + Send;

    /// Moves an entity into the given world.
    fn move_entity_to_world(&self, entity: EntityHandle, world: WorldHandle);
}

/// Swaps the entity a connection controls.
///
/// When a connection moves from the lobby into a room (or back), the
/// server replaces its controlled entity with one spawned from a new
/// template and returns the replacement's handle.
pub trait EntityHost: Send + Sync + 'static {
    fn replace_controlled_entity(
        &self,
        conn: ConnectionId,
        template: &str,
    ) -> EntityHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_display() {
        assert_eq!(WorldHandle(3).to_string(), "world#3");
        assert_eq!(EntityHandle(12).to_string(), "entity#12");
    }

    #[test]
    fn test_isolation_mode_default_is_shared() {
        assert_eq!(IsolationMode::default(), IsolationMode::Shared);
    }

    #[test]
    fn test_isolation_mode_serializes_as_pascal_case() {
        let json = serde_json::to_string(&IsolationMode::Physics3D).unwrap();
        assert_eq!(json, "\"Physics3D\"");
        let json = serde_json::to_string(&IsolationMode::Shared).unwrap();
        assert_eq!(json, "\"Shared\"");
    }
}
