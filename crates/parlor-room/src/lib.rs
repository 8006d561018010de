//! Room lifecycle management for Parlor.
//!
//! This crate is the authoritative heart of the lobby: which rooms exist,
//! which connection is in which room, and how a room comes into being and
//! goes away. Worlds (isolated scene/physics instances) are allocated from
//! an external host behind the [`WorldHost`] trait; this crate only
//! coordinates them.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — active rooms plus the connection→room index
//! - [`RoomLifecycle`] — drives create/join/teardown, including the
//!   suspending world-allocation steps
//! - [`WorldHost`] / [`EntityHost`] — the engine-side collaborators
//! - [`LobbyConfig`] — lobby settings (entity template, isolation, timeouts)
//! - [`RoomState`] — per-room lifecycle state

mod config;
mod error;
mod lifecycle;
mod registry;
mod world;

pub use config::{LobbyConfig, RoomState};
pub use error::RoomError;
pub use lifecycle::{CreateParams, RoomLifecycle, RoomSender};
pub use registry::{Room, RoomRegistry, RoomSnapshot};
pub use world::{
    EntityHandle, EntityHost, IsolationMode, WorldError, WorldHandle, WorldHost,
};
