//! Wire protocol for Parlor.
//!
//! This crate defines the messages that lobby clients and the server
//! exchange, and how they are converted to and from bytes:
//!
//! - **Types** ([`LobbyMessage`], [`RoomListing`]) — the message set.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — serialization strategy.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about connections, rooms, or worlds —
//! it only describes the shapes that travel on the wire. Validation of the
//! *content* (capacity limits, duplicate names) happens in the room layer.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{LobbyMessage, RoomListing};
