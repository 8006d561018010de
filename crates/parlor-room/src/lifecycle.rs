//! Room lifecycle orchestration: create, join, and teardown.
//!
//! Creating a room is a multi-step, suspending operation (the world host
//! may take many scheduling turns to produce an isolated world), and this
//! module is where those steps are sequenced against everything that can
//! race them: duplicate creates for the same name, a second request from
//! the same connection, and disconnects landing mid-flight.
//!
//! The registry lock is never held across a suspension point. While a
//! world loads, other connections' requests keep flowing; what claims the
//! connection for the in-flight create is its `attempts` entry, not the
//! lock. Registry insertion (not the pre-flight check) is the single
//! source of truth for name uniqueness, so two racing creates are settled
//! deterministically at `register`, and the loser's world is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use parlor_protocol::LobbyMessage;
use parlor_transport::ConnectionId;

use crate::config::LobbyConfig;
use crate::error::RoomError;
use crate::registry::{Room, RoomRegistry, RoomSnapshot};
use crate::world::{EntityHost, WorldError, WorldHandle, WorldHost};

/// Channel sender for delivering lobby messages to one connection.
///
/// Sends never block; a connection whose receiver is gone simply stops
/// getting messages.
pub type RoomSender = mpsc::UnboundedSender<LobbyMessage>;

/// A validated room-creation request.
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub room_name: String,
    pub room_data: String,
    pub world_template: String,
    pub max_occupancy: usize,
}

/// Where an in-flight create currently is.
///
/// ```text
/// Requested → WorldLoading → Registering → SwappingController
/// ```
///
/// The attempt record is removed when the create finishes, so `Active`
/// and `Failed` have no variant here — they are the absence of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreatePhase {
    Requested,
    WorldLoading,
    Registering,
    SwappingController,
}

impl fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "Requested"),
            Self::WorldLoading => write!(f, "WorldLoading"),
            Self::Registering => write!(f, "Registering"),
            Self::SwappingController => write!(f, "SwappingController"),
        }
    }
}

/// The resume state of one in-flight create: which room it is for, how far
/// it got, and whether its connection disappeared while it was suspended.
#[derive(Debug)]
struct Attempt {
    room_name: String,
    phase: CreatePhase,
    abandoned: bool,
}

/// Everything behind the single registry lock.
///
/// Attempts live next to the registry on purpose: "is this connection
/// free?" must consider both its binding and any in-flight request in one
/// atomic look.
#[derive(Default)]
struct LobbyState {
    registry: RoomRegistry,
    attempts: HashMap<ConnectionId, Attempt>,
}

impl LobbyState {
    fn connection_busy(&self, conn: ConnectionId) -> bool {
        self.registry.find_by_connection(conn).is_some()
            || self.attempts.contains_key(&conn)
    }

    fn set_phase(&mut self, conn: ConnectionId, phase: CreatePhase) {
        if let Some(attempt) = self.attempts.get_mut(&conn) {
            tracing::debug!(
                %conn,
                room = %attempt.room_name,
                from = %attempt.phase,
                to = %phase,
                "create phase"
            );
            attempt.phase = phase;
        }
    }
}

/// Drives rooms through their lifecycle against a world host.
///
/// Cheap to clone — all fields are shared. One instance (or its clones)
/// is handed to every connection handler; the internal mutex makes every
/// registry mutation a serialized transaction.
pub struct RoomLifecycle<W: WorldHost, E: EntityHost> {
    shared: Arc<Mutex<LobbyState>>,
    worlds: Arc<W>,
    entities: Arc<E>,
    config: LobbyConfig,
}

impl<W: WorldHost, E: EntityHost> Clone for RoomLifecycle<W, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            worlds: Arc::clone(&self.worlds),
            entities: Arc::clone(&self.entities),
            config: self.config.clone(),
        }
    }
}

impl<W: WorldHost, E: EntityHost> RoomLifecycle<W, E> {
    /// Creates a lifecycle coordinator with an empty registry.
    pub fn new(config: LobbyConfig, worlds: Arc<W>, entities: Arc<E>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(LobbyState::default())),
            worlds,
            entities,
            config,
        }
    }

    /// Creates a room and places the requesting connection inside it.
    ///
    /// Fast rejects (`AlreadyBound`, `DuplicateName`) happen before any
    /// world is allocated. The world load itself runs without the registry
    /// lock; on completion the attempt re-checks the registry and either
    /// finishes placement or releases the world it can no longer use.
    pub async fn create_room(
        &self,
        conn: ConnectionId,
        params: CreateParams,
        notify: &RoomSender,
    ) -> Result<(), RoomError> {
        if params.max_occupancy == 0 {
            return Err(RoomError::InvalidRequest(
                "max occupancy must be at least 1".to_string(),
            ));
        }

        // Claim the connection and the name (provisionally) in one look.
        {
            let mut state = self.shared.lock().await;
            if state.connection_busy(conn) {
                return Err(RoomError::AlreadyBound(conn));
            }
            if state.registry.find_by_name(&params.room_name).is_some() {
                return Err(RoomError::DuplicateName(params.room_name));
            }
            state.attempts.insert(
                conn,
                Attempt {
                    room_name: params.room_name.clone(),
                    phase: CreatePhase::Requested,
                    abandoned: false,
                },
            );
            state.set_phase(conn, CreatePhase::WorldLoading);
        }

        let loaded = tokio::time::timeout(
            self.config.world_load_timeout,
            self.worlds
                .load_world(&params.world_template, self.config.isolation),
        )
        .await;

        let world = match loaded {
            Ok(Ok(world)) => world,
            Ok(Err(e)) => {
                self.shared.lock().await.attempts.remove(&conn);
                tracing::warn!(%conn, room = %params.room_name, error = %e, "world load failed");
                return Err(e.into());
            }
            Err(_) => {
                self.shared.lock().await.attempts.remove(&conn);
                tracing::warn!(%conn, room = %params.room_name, "world load timed out");
                return Err(WorldError::LoadTimedOut(params.world_template).into());
            }
        };

        let mut state = self.shared.lock().await;
        state.set_phase(conn, CreatePhase::Registering);

        let abandoned = state
            .attempts
            .get(&conn)
            .map_or(true, |attempt| attempt.abandoned);
        if abandoned {
            // The connection disconnected while the world was loading.
            // Nothing was registered and no binding exists; the fresh
            // world must not be left orphaned.
            state.attempts.remove(&conn);
            drop(state);
            tracing::info!(
                %conn,
                room = %params.room_name,
                %world,
                "connection lost during world load, releasing world"
            );
            self.release_world(world).await;
            return Err(RoomError::ConnectionLost(conn));
        }

        let room = Room::new(
            params.room_name.clone(),
            params.room_data,
            params.world_template.clone(),
            world,
            params.max_occupancy,
        );
        if let Err(e) = state.registry.register(room) {
            // Another create completed the same name while this world was
            // loading. The registry insert settles the race; this attempt
            // releases its world rather than leaving a second copy around.
            state.attempts.remove(&conn);
            drop(state);
            tracing::warn!(%conn, room = %params.room_name, %world, "lost create race, releasing world");
            self.release_world(world).await;
            return Err(e);
        }

        state.set_phase(conn, CreatePhase::SwappingController);
        let _ = notify.send(LobbyMessage::WorldLoad {
            world_template: params.world_template,
        });
        let entity = self
            .entities
            .replace_controlled_entity(conn, &self.config.room_entity_template);
        self.worlds.move_entity_to_world(entity, world);

        if let Err(e) = state.registry.bind(conn, &params.room_name) {
            // Cannot happen while attempts block a second request for this
            // connection and the lock has been held since registration.
            // If it ever does, the placement above is not rolled back; the
            // room and its world are, so nothing leaks.
            tracing::error!(
                %conn,
                room = %params.room_name,
                error = %e,
                "bind failed after world placement"
            );
            state.attempts.remove(&conn);
            let _ = state.registry.unregister(&params.room_name);
            drop(state);
            self.release_world(world).await;
            return Err(RoomError::InvariantViolation(format!(
                "bind failed after registering room '{}': {e}",
                params.room_name
            )));
        }

        state.attempts.remove(&conn);
        tracing::info!(%conn, room = %params.room_name, %world, "room created");
        Ok(())
    }

    /// Places a connection into an existing room.
    ///
    /// Runs in a single transaction against the registry: validation,
    /// client notification, entity swap, and binding all happen under one
    /// lock acquisition, so a join can never interleave with a teardown
    /// or another join's capacity check.
    pub async fn join_room(
        &self,
        conn: ConnectionId,
        room_name: &str,
        notify: &RoomSender,
    ) -> Result<(), RoomError> {
        let mut state = self.shared.lock().await;

        if state.connection_busy(conn) {
            return Err(RoomError::AlreadyBound(conn));
        }
        let room = state
            .registry
            .find_by_name(room_name)
            .filter(|r| r.state().is_joinable())
            .ok_or_else(|| RoomError::NotFound(room_name.to_string()))?;
        if room.is_full() {
            return Err(RoomError::RoomFull(room_name.to_string()));
        }
        let world = room.world();
        let world_template = room.world_template().to_string();

        let _ = notify.send(LobbyMessage::WorldLoad { world_template });
        let entity = self
            .entities
            .replace_controlled_entity(conn, &self.config.room_entity_template);
        self.worlds.move_entity_to_world(entity, world);

        let occupants = state.registry.bind(conn, room_name)?;
        tracing::info!(%conn, room = %room_name, occupants, "joined room");
        Ok(())
    }

    /// Reacts to a lost connection.
    ///
    /// Marks any in-flight create as abandoned (its completion will release
    /// the world it was waiting on), removes the connection's binding, and
    /// tears the vacated room down if it just emptied. Safe to call again
    /// for a connection already handled — the second call is a no-op.
    pub async fn connection_lost(&self, conn: ConnectionId) {
        let vacated = {
            let mut state = self.shared.lock().await;
            if let Some(attempt) = state.attempts.get_mut(&conn) {
                attempt.abandoned = true;
                tracing::debug!(
                    %conn,
                    room = %attempt.room_name,
                    phase = %attempt.phase,
                    "disconnect raced an in-flight create"
                );
            }
            state.registry.unbind(conn)
        };

        if let Some(room) = vacated {
            if room.occupant_count == 0 {
                self.teardown_if_empty(&room.name).await;
            }
        }
    }

    /// Tears a room down if it is empty: releases its world, then removes
    /// it from the registry.
    ///
    /// The room flips to `Unloading` before the (suspending) world release
    /// starts, which keeps its name reserved and refuses joins for the
    /// duration. Only one caller can win `begin_teardown`, so the release
    /// runs exactly once per emptying.
    pub async fn teardown_if_empty(&self, room_name: &str) {
        let world = {
            let mut state = self.shared.lock().await;
            match state.registry.begin_teardown(room_name) {
                Some(world) => world,
                None => return,
            }
        };

        tracing::info!(room = %room_name, %world, "room empty, releasing world");
        self.release_world(world).await;

        let mut state = self.shared.lock().await;
        if let Err(e) = state.registry.unregister(room_name) {
            // The name stayed reserved (Unloading) the whole time, so the
            // room cannot have been replaced. Surfaced, not retried.
            tracing::error!(
                room = %room_name,
                error = %e,
                "invariant violation: room vanished during teardown"
            );
        }
    }

    /// Snapshots the open rooms for a listing response.
    pub async fn snapshot(&self) -> Vec<RoomSnapshot> {
        self.shared.lock().await.registry.snapshot()
    }

    /// The room a connection is currently bound to, if any.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<RoomSnapshot> {
        self.shared
            .lock()
            .await
            .registry
            .find_by_connection(conn)
            .map(Room::snapshot)
    }

    /// Finds the room that owns a world instance.
    ///
    /// For engine-side callers that only have world-scoped context, e.g.
    /// a physics callback that fires inside one isolated world.
    pub async fn room_by_world(&self, world: WorldHandle) -> Option<RoomSnapshot> {
        self.shared
            .lock()
            .await
            .registry
            .find_by_world(world)
            .map(Room::snapshot)
    }

    async fn release_world(&self, world: WorldHandle) {
        if let Err(e) = self.worlds.unload_world(world).await {
            tracing::error!(%world, error = %e, "failed to release world");
        }
    }
}
