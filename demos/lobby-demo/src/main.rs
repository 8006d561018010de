//! A runnable lobby server wired to a simulated game engine.
//!
//! Real deployments implement [`WorldHost`] and [`EntityHost`] against an
//! actual engine (scene streaming, physics scenes, spawned avatars). The
//! `SimEngine` here keeps the same contract in plain memory: worlds are
//! map entries, avatars are records of "this connection controls this
//! entity in this world". Enough to run the server for poking at with a
//! WebSocket client, and to test that the lobby actually isolates rooms.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parlor::prelude::*;

// ---------------------------------------------------------------------------
// Simulated engine
// ---------------------------------------------------------------------------

struct SimWorld {
    template: String,
    isolation: IsolationMode,
}

struct Avatar {
    conn: ConnectionId,
    world: Option<WorldHandle>,
}

#[derive(Default)]
struct SimState {
    next_world: AtomicU64,
    next_entity: AtomicU64,
    worlds: Mutex<HashMap<WorldHandle, SimWorld>>,
    avatars: Mutex<HashMap<EntityHandle, Avatar>>,
}

/// In-memory stand-in for the engine. Clones share state, so the same
/// engine can be handed to the server as both the world host and the
/// entity host.
#[derive(Clone, Default)]
struct SimEngine {
    inner: Arc<SimState>,
}

impl WorldHost for SimEngine {
    fn load_world(
        &self,
        template: &str,
        isolation: IsolationMode,
    ) -> impl Future<Output = Result<WorldHandle, WorldError>> + Send {
        let inner = Arc::clone(&self.inner);
        let template = template.to_string();
        async move {
            // Even a simulated scene load takes a couple of frames.
            tokio::time::sleep(Duration::from_millis(5)).await;
            let world =
                WorldHandle(inner.next_world.fetch_add(1, Ordering::Relaxed) + 1);
            tracing::info!(%world, %template, ?isolation, "sim world up");
            inner
                .worlds
                .lock()
                .unwrap()
                .insert(world, SimWorld { template, isolation });
            Ok(world)
        }
    }

    fn unload_world(
        &self,
        world: WorldHandle,
    ) -> impl Future<Output = Result<(), WorldError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if let Some(w) = inner.worlds.lock().unwrap().remove(&world) {
                tracing::info!(
                    %world,
                    template = %w.template,
                    isolation = ?w.isolation,
                    "sim world down"
                );
            }
            // Anything still standing in the world is left placeless.
            for avatar in inner.avatars.lock().unwrap().values_mut() {
                if avatar.world == Some(world) {
                    avatar.world = None;
                }
            }
            Ok(())
        }
    }

    fn move_entity_to_world(&self, entity: EntityHandle, world: WorldHandle) {
        if let Some(avatar) = self.inner.avatars.lock().unwrap().get_mut(&entity) {
            avatar.world = Some(world);
        }
    }
}

impl EntityHost for SimEngine {
    fn replace_controlled_entity(
        &self,
        conn: ConnectionId,
        template: &str,
    ) -> EntityHandle {
        let mut avatars = self.inner.avatars.lock().unwrap();
        // The old avatar is despawned; the connection controls the new one.
        avatars.retain(|_, a| a.conn != conn);
        let entity =
            EntityHandle(self.inner.next_entity.fetch_add(1, Ordering::Relaxed) + 1);
        tracing::debug!(%conn, %entity, template, "avatar swapped");
        avatars.insert(entity, Avatar { conn, world: None });
        entity
    }
}

#[cfg(test)]
impl SimEngine {
    fn worlds(&self) -> Vec<WorldHandle> {
        self.inner.worlds.lock().unwrap().keys().copied().collect()
    }

    fn world_count(&self) -> usize {
        self.inner.worlds.lock().unwrap().len()
    }

    fn population(&self, world: WorldHandle) -> usize {
        self.inner
            .avatars
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.world == Some(world))
            .count()
    }

    fn isolation_of(&self, world: WorldHandle) -> Option<IsolationMode> {
        self.inner
            .worlds
            .lock()
            .unwrap()
            .get(&world)
            .map(|w| w.isolation)
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    eprintln!("starting lobby server on 0.0.0.0:8080");

    let engine = SimEngine::default();
    let server = ParlorServerBuilder::new()
        .bind("0.0.0.0:8080")
        .lobby_config(LobbyConfig {
            isolation: IsolationMode::Physics3D,
            ..LobbyConfig::default()
        })
        .build(engine.clone(), engine)
        .await?;

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start_with(config: LobbyConfig) -> (String, SimEngine) {
        let engine = SimEngine::default();
        let server = ParlorServerBuilder::new()
            .bind("127.0.0.1:0")
            .lobby_config(config)
            .build(engine.clone(), engine.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        (addr, engine)
    }

    async fn start() -> (String, SimEngine) {
        start_with(LobbyConfig::default()).await
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn send(ws: &mut Ws, msg: &LobbyMessage) {
        let bytes = serde_json::to_vec(msg).unwrap();
        ws.send(Message::Binary(bytes.into())).await.unwrap();
    }

    async fn recv(ws: &mut Ws) -> LobbyMessage {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    /// Round-trips a list request. Doubles as a sync point: the handler
    /// works one message at a time, so once the response is back, every
    /// earlier request on this connection has fully settled.
    async fn list(ws: &mut Ws) -> Vec<RoomListing> {
        send(ws, &LobbyMessage::RoomListRequest).await;
        recv(ws).await.listings().expect("expected RoomListResponse")
    }

    fn create_msg(name: &str, max_players: i32) -> LobbyMessage {
        LobbyMessage::CreateRoomRequest {
            room_name: name.to_string(),
            room_data: String::new(),
            world_template: "arena".to_string(),
            max_players,
        }
    }

    /// Creates a room and waits until the server has finished placing the
    /// creator.
    async fn create_room(ws: &mut Ws, name: &str, max_players: i32) {
        send(ws, &create_msg(name, max_players)).await;
        let notify = recv(ws).await;
        assert!(matches!(notify, LobbyMessage::WorldLoad { .. }));
        list(ws).await;
    }

    #[tokio::test]
    async fn test_create_spawns_world_with_creator_inside() {
        let (addr, engine) = start().await;
        let mut creator = ws(&addr).await;

        create_room(&mut creator, "Alpha", 4).await;

        let worlds = engine.worlds();
        assert_eq!(worlds.len(), 1);
        assert_eq!(
            engine.population(worlds[0]),
            1,
            "creator's avatar should be standing in the new world"
        );
    }

    #[tokio::test]
    async fn test_each_room_gets_its_own_world() {
        let (addr, engine) = start().await;

        let mut c1 = ws(&addr).await;
        create_room(&mut c1, "Alpha", 4).await;
        let mut c2 = ws(&addr).await;
        create_room(&mut c2, "Beta", 4).await;

        let worlds = engine.worlds();
        assert_eq!(worlds.len(), 2, "rooms must not share a world");
        assert_ne!(worlds[0], worlds[1]);
        assert_eq!(engine.population(worlds[0]), 1);
        assert_eq!(engine.population(worlds[1]), 1);
    }

    #[tokio::test]
    async fn test_join_places_avatar_in_the_room_world() {
        let (addr, engine) = start().await;
        let mut creator = ws(&addr).await;
        create_room(&mut creator, "Alpha", 4).await;

        let mut joiner = ws(&addr).await;
        send(
            &mut joiner,
            &LobbyMessage::JoinRoomRequest {
                room_name: "Alpha".to_string(),
            },
        )
        .await;
        assert!(matches!(
            recv(&mut joiner).await,
            LobbyMessage::WorldLoad { .. }
        ));
        list(&mut joiner).await;

        let worlds = engine.worlds();
        assert_eq!(worlds.len(), 1);
        assert_eq!(engine.population(worlds[0]), 2);
    }

    #[tokio::test]
    async fn test_world_is_destroyed_after_room_empties() {
        let (addr, engine) = start().await;
        let mut creator = ws(&addr).await;
        create_room(&mut creator, "Alpha", 4).await;
        assert_eq!(engine.world_count(), 1);

        creator.close(None).await.unwrap();
        drop(creator);

        let mut remaining = usize::MAX;
        for _ in 0..40 {
            remaining = engine.world_count();
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(remaining, 0, "empty room's world should be unloaded");
    }

    #[tokio::test]
    async fn test_isolation_mode_reaches_the_engine() {
        let (addr, engine) = start_with(LobbyConfig {
            isolation: IsolationMode::Physics3D,
            ..LobbyConfig::default()
        })
        .await;
        let mut creator = ws(&addr).await;
        create_room(&mut creator, "Alpha", 4).await;

        let worlds = engine.worlds();
        assert_eq!(
            engine.isolation_of(worlds[0]),
            Some(IsolationMode::Physics3D)
        );
    }
}
