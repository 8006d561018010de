//! The room registry: active rooms and the connection→room index.
//!
//! This is pure in-memory state with no external calls. It is the single
//! source of truth for three invariants:
//!
//! - room names are unique while a room is registered
//! - a connection is bound to at most one room at a time
//! - a room's occupant count never exceeds its capacity
//!
//! # Concurrency note
//!
//! `RoomRegistry` is NOT thread-safe by itself — plain `HashMap`s, `&mut`
//! methods. The lifecycle layer owns it behind a single `tokio::sync::Mutex`
//! and every mutation happens under that one lock, which is what makes
//! `bind`/`unbind` atomic with respect to racing creates and disconnects.

use std::collections::{HashMap, HashSet};

use parlor_transport::ConnectionId;

use crate::config::RoomState;
use crate::error::RoomError;
use crate::world::WorldHandle;

/// An active room: one isolated gameplay session.
#[derive(Debug)]
pub struct Room {
    name: String,
    data: String,
    world_template: String,
    world: WorldHandle,
    max_occupancy: usize,
    occupants: HashSet<ConnectionId>,
    state: RoomState,
}

impl Room {
    /// Creates a room with no occupants, ready to be registered.
    pub fn new(
        name: String,
        data: String,
        world_template: String,
        world: WorldHandle,
        max_occupancy: usize,
    ) -> Self {
        Self {
            name,
            data,
            world_template,
            world,
            max_occupancy,
            occupants: HashSet::new(),
            state: RoomState::Open,
        }
    }

    /// The room's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque caller-defined metadata.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The template the room's world was loaded from.
    pub fn world_template(&self) -> &str {
        &self.world_template
    }

    /// Handle to the room's isolated world instance.
    pub fn world(&self) -> WorldHandle {
        self.world
    }

    /// Occupancy ceiling.
    pub fn max_occupancy(&self) -> usize {
        self.max_occupancy
    }

    /// Number of connections currently inside.
    ///
    /// Derived from the occupant set, so it can never disagree with it.
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    /// The connections currently inside the room.
    pub fn occupants(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.occupants.iter().copied()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Returns `true` if every slot is taken.
    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.max_occupancy
    }

    /// A listing/teardown view of the room's metadata.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            name: self.name.clone(),
            data: self.data.clone(),
            world_template: self.world_template.clone(),
            occupant_count: self.occupants.len(),
            max_occupancy: self.max_occupancy,
        }
    }
}

/// A point-in-time view of one room's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub name: String,
    pub data: String,
    pub world_template: String,
    pub occupant_count: usize,
    pub max_occupancy: usize,
}

/// Authoritative set of active rooms and connection bindings.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Active rooms, keyed by name.
    rooms: HashMap<String, Room>,

    /// Maps each bound connection to the name of its room.
    /// A connection can be in at most ONE room at a time (key invariant).
    bindings: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a room by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Looks up the room a connection is bound to. O(1) via the binding map.
    pub fn find_by_connection(&self, conn: ConnectionId) -> Option<&Room> {
        self.bindings
            .get(&conn)
            .and_then(|name| self.rooms.get(name))
    }

    /// Looks up a room by its world handle.
    ///
    /// Used by engine-side callers that only have world-scoped context
    /// (a callback firing inside a particular world instance).
    pub fn find_by_world(&self, world: WorldHandle) -> Option<&Room> {
        self.rooms.values().find(|r| r.world == world)
    }

    /// Inserts a new room.
    ///
    /// # Errors
    /// [`RoomError::DuplicateName`] if a room with this name is already
    /// registered — including one still `Unloading`; the name stays
    /// reserved until its world is fully released.
    pub fn register(&mut self, room: Room) -> Result<(), RoomError> {
        if self.rooms.contains_key(&room.name) {
            return Err(RoomError::DuplicateName(room.name));
        }
        tracing::info!(room = %room.name, world = %room.world, "room registered");
        self.rooms.insert(room.name.clone(), room);
        Ok(())
    }

    /// Binds a connection into a room, adding it to the occupant set.
    ///
    /// The binding and the occupant-set insertion happen together under
    /// the caller's lock; there is no state in which one exists without
    /// the other. Returns the room's new occupant count.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyBound`] — the connection is in a room already
    /// - [`RoomError::NotFound`] — no such room, or it is unloading
    /// - [`RoomError::RoomFull`] — no free slots; capacity is enforced
    ///   here, at the point of mutation, so the ceiling holds even if a
    ///   caller's earlier check went stale
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        name: &str,
    ) -> Result<usize, RoomError> {
        if self.bindings.contains_key(&conn) {
            return Err(RoomError::AlreadyBound(conn));
        }
        let room = self
            .rooms
            .get_mut(name)
            .filter(|r| r.state.is_joinable())
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        if room.occupants.len() >= room.max_occupancy {
            return Err(RoomError::RoomFull(name.to_string()));
        }

        room.occupants.insert(conn);
        self.bindings.insert(conn, name.to_string());
        tracing::info!(
            %conn,
            room = %name,
            occupants = room.occupants.len(),
            "connection bound"
        );
        Ok(room.occupants.len())
    }

    /// Removes a connection's binding and occupant-set entry.
    ///
    /// A no-op (returns `None`) if the connection was not bound — safe to
    /// call again for a connection that already left. Otherwise returns the
    /// vacated room's snapshot, occupant count already decremented, so the
    /// caller can decide whether to tear the room down.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<RoomSnapshot> {
        let name = self.bindings.remove(&conn)?;
        let room = self
            .rooms
            .get_mut(&name)
            .expect("binding points at a registered room");
        room.occupants.remove(&conn);
        tracing::info!(
            %conn,
            room = %name,
            occupants = room.occupants.len(),
            "connection unbound"
        );
        Some(room.snapshot())
    }

    /// Removes a room entirely, returning it.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room with this name is registered.
    pub fn unregister(&mut self, name: &str) -> Result<Room, RoomError> {
        let room = self
            .rooms
            .remove(name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        tracing::info!(room = %name, "room unregistered");
        Ok(room)
    }

    /// Flips an empty, open room to `Unloading` and hands back its world.
    ///
    /// Returns `None`, meaning teardown must not start, if the room is
    /// missing, already unloading, or has occupants again.
    pub fn begin_teardown(&mut self, name: &str) -> Option<WorldHandle> {
        let room = self.rooms.get_mut(name)?;
        if room.state != RoomState::Open || !room.occupants.is_empty() {
            return None;
        }
        room.state = RoomState::Unloading;
        Some(room.world)
    }

    /// Snapshots every `Open` room, in registry iteration order.
    ///
    /// Order carries no meaning. Unloading rooms are omitted — from the
    /// lobby's point of view they are already gone.
    pub fn snapshot(&self) -> Vec<RoomSnapshot> {
        self.rooms
            .values()
            .filter(|r| r.state == RoomState::Open)
            .map(Room::snapshot)
            .collect()
    }

    /// Number of registered rooms (any state).
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms are registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
