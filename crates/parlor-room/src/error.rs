//! Error types for the room layer.

use parlor_transport::ConnectionId;

use crate::world::WorldError;

/// Errors that can occur during room operations.
///
/// None of these reach the client as structured errors — the protocol
/// handler logs them and drops the request. They exist so every layer on
/// the server side can tell exactly why an operation was refused.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A room with this name is already registered.
    #[error("room '{0}' already exists")]
    DuplicateName(String),

    /// The connection is already in a room, or has a create/join in
    /// flight. One room per connection, one request at a time.
    #[error("{0} is already bound to a room or has a request in flight")]
    AlreadyBound(ConnectionId),

    /// No room with this name is registered (or it is being torn down).
    #[error("room '{0}' not found")]
    NotFound(String),

    /// The room has no free slots.
    #[error("room '{0}' is full")]
    RoomFull(String),

    /// The request was malformed (non-positive capacity, empty name).
    /// Rejected before anything is allocated.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The connection disconnected while its create was in flight; the
    /// world allocated for it was released instead of being bound.
    #[error("{0} was lost before room placement completed")]
    ConnectionLost(ConnectionId),

    /// The world host failed or timed out.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Internal consistency failure. Logged and surfaced to operators;
    /// never expected in normal operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
