//! # Parlor
//!
//! Multi-room lobby coordinator for networked game servers.
//!
//! Clients connect over a transport, browse the room list, create rooms,
//! and join them. The server gives every room its own isolated world
//! instance (allocated from an engine-side [`WorldHost`]), tracks which
//! connection is in which room, and tears a room down when its last
//! occupant leaves. One room per connection, unique room names, hard
//! capacity ceilings — enforced server-side, not trusted to clients.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parlor::prelude::*;
//!
//! # async fn run<MyWorldHost, MyEntityHost>(
//! #     worlds: MyWorldHost,
//! #     entities: MyEntityHost,
//! # ) -> Result<(), ParlorError>
//! # where
//! #     MyWorldHost: WorldHost,
//! #     MyEntityHost: EntityHost,
//! # {
//! let server = ParlorServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(worlds, entities)
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! [`WorldHost`]: parlor_room::WorldHost

mod error;
mod handler;
mod server;

pub use error::ParlorError;
pub use server::{ParlorServer, ParlorServerBuilder};

pub mod prelude {
    //! Everything needed to stand up a lobby server.

    pub use crate::{ParlorError, ParlorServer, ParlorServerBuilder};
    pub use parlor_protocol::{Codec, JsonCodec, LobbyMessage, RoomListing};
    pub use parlor_room::{
        CreateParams, EntityHandle, EntityHost, IsolationMode, LobbyConfig,
        RoomError, RoomLifecycle, RoomSnapshot, WorldError, WorldHandle,
        WorldHost,
    };
    pub use parlor_transport::ConnectionId;
}
