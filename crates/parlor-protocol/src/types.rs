//! The lobby message set.
//!
//! Five message kinds cover the whole lobby protocol:
//!
//! - `RoomListRequest` / `RoomListResponse` — browse open rooms.
//! - `CreateRoomRequest` — allocate a new isolated room.
//! - `JoinRoomRequest` — enter an existing room by name.
//! - `WorldLoad` — server tells a client to load a world locally so it
//!   matches the isolated instance it is being placed into.
//!
//! `RoomListResponse` carries parallel arrays rather than an array of
//! structs: index `i` of every array describes the same room, and all five
//! arrays have the same length. That is the wire contract clients are
//! written against; [`RoomListing`] provides the struct view on either side
//! of it.

use serde::{Deserialize, Serialize};

/// One room's entry in a listing, as seen by lobby UIs.
///
/// This type never appears on the wire directly (the response flattens
/// listings into parallel arrays), but it is the convenient form for
/// building and consuming them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListing {
    /// The room's unique name.
    pub name: String,
    /// Opaque caller-defined metadata (map name, rules, motd...).
    pub data: String,
    /// The world template the room was created from.
    pub world_template: String,
    /// Number of connections currently inside.
    pub current_count: usize,
    /// Occupancy ceiling.
    pub max_count: usize,
}

/// Every message that travels between a lobby client and the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so a create
/// request looks like:
///
/// ```json
/// { "type": "CreateRoomRequest", "room_name": "Alpha", ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyMessage {
    /// Client → Server: "show me the open rooms."
    RoomListRequest,

    /// Server → Client: the room list snapshot.
    ///
    /// Parallel arrays, index-aligned; every array has one element per
    /// active room at snapshot time. Order carries no meaning.
    RoomListResponse {
        names: Vec<String>,
        datas: Vec<String>,
        world_templates: Vec<String>,
        current_counts: Vec<usize>,
        max_counts: Vec<usize>,
    },

    /// Client → Server: "create this room and put me in it."
    ///
    /// `max_players` is validated server-side; anything below 1 is
    /// malformed and the request is dropped.
    CreateRoomRequest {
        room_name: String,
        room_data: String,
        world_template: String,
        max_players: i32,
    },

    /// Client → Server: "put me in this room."
    JoinRoomRequest { room_name: String },

    /// Server → Client: "load this world; you are being placed into it."
    WorldLoad { world_template: String },
}

impl LobbyMessage {
    /// Builds a `RoomListResponse` from per-room listings.
    pub fn room_list(listings: impl IntoIterator<Item = RoomListing>) -> Self {
        let mut names = Vec::new();
        let mut datas = Vec::new();
        let mut world_templates = Vec::new();
        let mut current_counts = Vec::new();
        let mut max_counts = Vec::new();
        for l in listings {
            names.push(l.name);
            datas.push(l.data);
            world_templates.push(l.world_template);
            current_counts.push(l.current_count);
            max_counts.push(l.max_count);
        }
        Self::RoomListResponse {
            names,
            datas,
            world_templates,
            current_counts,
            max_counts,
        }
    }

    /// Zips a `RoomListResponse` back into per-room listings.
    ///
    /// Returns `None` for any other variant or if the arrays disagree on
    /// length (a malformed response).
    pub fn listings(&self) -> Option<Vec<RoomListing>> {
        let Self::RoomListResponse {
            names,
            datas,
            world_templates,
            current_counts,
            max_counts,
        } = self
        else {
            return None;
        };
        let n = names.len();
        if [datas.len(), world_templates.len(), current_counts.len(), max_counts.len()]
            .iter()
            .any(|&len| len != n)
        {
            return None;
        }
        Some(
            (0..n)
                .map(|i| RoomListing {
                    name: names[i].clone(),
                    data: datas[i].clone(),
                    world_template: world_templates[i].clone(),
                    current_count: current_counts[i],
                    max_count: max_counts[i],
                })
                .collect(),
        )
    }
}
