//! Per-connection handler: message decoding, dispatch, and the
//! disconnect hook.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!
//! 1. Set up the outbound channel + writer task (responses and `WorldLoad`
//!    notifications flow through it, including from inside the lifecycle).
//! 2. Install the disconnect guard.
//! 3. Loop: receive → decode `LobbyMessage` → dispatch.
//!
//! Rejections never produce a reply. The protocol has no error message
//! kind; a client whose request was refused simply sees nothing happen,
//! and the reason lands in the server log.

use std::sync::Arc;

use parlor_protocol::{Codec, LobbyMessage, RoomListing};
use parlor_room::{
    CreateParams, EntityHost, RoomError, RoomLifecycle, RoomSender, WorldHost,
};
use parlor_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ParlorError;
use crate::server::ServerState;

/// Drop guard that runs the connection-lost hook when the handler exits.
///
/// Membership cleanup and room teardown hang off this guard, so they
/// happen exactly once per connection — on clean close, on receive error,
/// and even if the handler panics. Since `Drop` is synchronous, the async
/// hook runs in a fire-and-forget task.
struct DisconnectGuard<W: WorldHost, E: EntityHost> {
    conn_id: ConnectionId,
    lifecycle: RoomLifecycle<W, E>,
}

impl<W: WorldHost, E: EntityHost> Drop for DisconnectGuard<W, E> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let lifecycle = self.lifecycle.clone();
        tokio::spawn(async move {
            lifecycle.connection_lost(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<W, E, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<W, E, C>>,
) -> Result<(), ParlorError>
where
    W: WorldHost,
    E: EntityHost,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // Everything the server says to this client goes through one channel;
    // the writer task owns the socket's send half. The lifecycle gets the
    // sender too, which is how `WorldLoad` reaches the client from the
    // middle of a create.
    let (outbound, mut outbox) = mpsc::unbounded_channel::<LobbyMessage>();
    let writer = {
        let conn = conn.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = outbox.recv().await {
                let bytes = match state.codec.encode(&msg) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        })
    };

    let _guard = DisconnectGuard {
        conn_id,
        lifecycle: state.lifecycle.clone(),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let msg: LobbyMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode message");
                continue;
            }
        };

        handle_lobby_message(&state, conn_id, msg, &outbound).await;
    }

    // Close the channel, let the writer drain what's queued, then exit;
    // _guard drops here → the connection-lost hook fires.
    drop(outbound);
    let _ = writer.await;
    Ok(())
}

/// Dispatches one decoded client message.
async fn handle_lobby_message<W, E, C>(
    state: &Arc<ServerState<W, E, C>>,
    conn_id: ConnectionId,
    msg: LobbyMessage,
    outbound: &RoomSender,
) where
    W: WorldHost,
    E: EntityHost,
    C: Codec,
{
    match msg {
        LobbyMessage::RoomListRequest => {
            let listings: Vec<RoomListing> = state
                .lifecycle
                .snapshot()
                .await
                .into_iter()
                .map(|room| RoomListing {
                    name: room.name,
                    data: room.data,
                    world_template: room.world_template,
                    current_count: room.occupant_count,
                    max_count: room.max_occupancy,
                })
                .collect();
            let _ = outbound.send(LobbyMessage::room_list(listings));
        }

        LobbyMessage::CreateRoomRequest {
            room_name,
            room_data,
            world_template,
            max_players,
        } => {
            let params = match validate_create(
                room_name,
                room_data,
                world_template,
                max_players,
            ) {
                Ok(params) => params,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "create room rejected");
                    return;
                }
            };
            // Suspends while the world loads. This connection processes
            // nothing else until the create resolves; other connections
            // run in their own tasks and are unaffected.
            if let Err(e) =
                state.lifecycle.create_room(conn_id, params, outbound).await
            {
                tracing::warn!(%conn_id, error = %e, "create room failed");
            }
        }

        LobbyMessage::JoinRoomRequest { room_name } => {
            if let Err(e) =
                state.lifecycle.join_room(conn_id, &room_name, outbound).await
            {
                tracing::warn!(%conn_id, room = %room_name, error = %e, "join room rejected");
            }
        }

        LobbyMessage::RoomListResponse { .. } | LobbyMessage::WorldLoad { .. } => {
            tracing::debug!(%conn_id, "ignoring server-to-client message from a client");
        }
    }
}

/// Validates a create request's fields before anything is allocated.
fn validate_create(
    room_name: String,
    room_data: String,
    world_template: String,
    max_players: i32,
) -> Result<CreateParams, RoomError> {
    if room_name.trim().is_empty() {
        return Err(RoomError::InvalidRequest(
            "room name must not be empty".to_string(),
        ));
    }
    if max_players < 1 {
        return Err(RoomError::InvalidRequest(format!(
            "max_players must be positive, got {max_players}"
        )));
    }
    Ok(CreateParams {
        room_name,
        room_data,
        world_template,
        max_occupancy: max_players as usize,
    })
}
