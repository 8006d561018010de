//! `ParlorServer` builder and accept loop.
//!
//! This is the entry point for running a lobby server. It ties the layers
//! together: transport → protocol → room lifecycle. The engine-side
//! collaborators (world host, entity host) are injected at build time;
//! the server never implements them itself.

use std::sync::Arc;

use parlor_protocol::{Codec, JsonCodec};
use parlor_room::{EntityHost, LobbyConfig, RoomLifecycle, WorldHost};
use parlor_transport::{Transport, WebSocketTransport};

use crate::ParlorError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. All room
/// and binding mutations go through the lifecycle's own lock.
pub(crate) struct ServerState<W: WorldHost, E: EntityHost, C: Codec> {
    pub(crate) lifecycle: RoomLifecycle<W, E>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Parlor server.
///
/// # Example
///
/// ```rust,ignore
/// use parlor::prelude::*;
///
/// let server = ParlorServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .lobby_config(LobbyConfig::default())
///     .build(my_world_host, my_entity_host)
///     .await?;
/// server.run().await
/// ```
pub struct ParlorServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
}

impl ParlorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            lobby_config: LobbyConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Builds and binds the server against the given engine hosts.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults.
    pub async fn build<W: WorldHost, E: EntityHost>(
        self,
        worlds: W,
        entities: E,
    ) -> Result<ParlorServer<W, E, JsonCodec>, ParlorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            lifecycle: RoomLifecycle::new(
                self.lobby_config,
                Arc::new(worlds),
                Arc::new(entities),
            ),
            codec: JsonCodec,
        });

        Ok(ParlorServer { transport, state })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Parlor lobby server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParlorServer<W: WorldHost, E: EntityHost, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<W, E, C>>,
}

impl<W, E, C> ParlorServer<W, E, C>
where
    W: WorldHost,
    E: EntityHost,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the room lifecycle.
    ///
    /// For engine-side integration outside the message protocol: listing
    /// rooms programmatically, or resolving a room from a world-scoped
    /// callback via `room_by_world`.
    pub fn lifecycle(&self) -> RoomLifecycle<W, E> {
        self.state.lifecycle.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each,
    /// so one connection's in-flight room creation never stalls another's
    /// requests. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ParlorError> {
        tracing::info!("Parlor server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection::<W, E, C>(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
