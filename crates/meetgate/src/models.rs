//! Request and response types of the upstream API.
//!
//! Only the fields the gateway itself relies on are typed; everything else a
//! room or recording carries is kept in `config` / `extra` as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A video room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Upstream identifier.
    pub id: String,
    /// Unique room name; used in room URLs and as the lookup key.
    pub name: String,
    /// Public URL of the room.
    #[serde(default)]
    pub url: String,
    /// Room privacy: `public` or `private`.
    #[serde(default)]
    pub privacy: String,
    /// Creation time as reported upstream (ISO 8601).
    #[serde(default)]
    pub created_at: String,
    /// Room properties.
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// A page of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of resources upstream, not just on this page.
    pub total_count: u64,
    /// Resources on this page.
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// A page with nothing on it.
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            data: Vec::new(),
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A page of rooms.
pub type RoomList = Page<Room>;

/// A page of recordings.
pub type RecordingList = Page<Recording>;

/// Cursor pagination for list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListParams {
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Return resources after this id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_after: Option<String>,
    /// Return resources before this id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_before: Option<String>,
    /// Only recordings of this room. Ignored when listing rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

impl ListParams {
    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the forward cursor.
    pub fn starting_after(mut self, id: impl Into<String>) -> Self {
        self.starting_after = Some(id.into());
        self
    }

    /// Restricts recordings to one room.
    pub fn room_name(mut self, name: impl Into<String>) -> Self {
        self.room_name = Some(name.into());
        self
    }

    /// A stable cache key for this page.
    ///
    /// Absent fields are left out and values are JSON-escaped, so two
    /// parameter sets share a key only when they send the same query.
    pub fn cache_key(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(id) = &self.starting_after {
            query.push(("starting_after", id.clone()));
        }
        if let Some(id) = &self.ending_before {
            query.push(("ending_before", id.clone()));
        }
        if let Some(name) = &self.room_name {
            query.push(("room_name", name.clone()));
        }
        query
    }
}

/// Body of a create-room request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRoom {
    /// Room name; generated upstream when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `public` or `private`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    /// Room properties.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub properties: Map<String, Value>,
}

/// Body of an update-room request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRoom {
    /// New privacy setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    /// Properties to change.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub properties: Map<String, Value>,
}

/// Upstream acknowledgement of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// Whether the resource was deleted.
    pub deleted: bool,
    /// Name or id of the deleted resource.
    #[serde(default, alias = "id")]
    pub name: String,
}

/// Properties of a meeting token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingTokenRequest {
    /// Room the token grants access to.
    pub room_name: String,
    /// Whether the holder is a meeting owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
    /// Display name of the participant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Expiry as a Unix timestamp in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Further token properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeetingTokenRequest {
    /// A token for `room_name` with no other properties.
    pub fn for_room(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
pub(crate) struct TokenBody<'a> {
    pub(crate) properties: &'a MeetingTokenRequest,
}

/// A freshly generated meeting token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingToken {
    /// The signed token.
    pub token: String,
}

/// Result of validating a meeting token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Whether upstream accepted the token.
    pub is_valid: bool,
    /// The token's decoded properties when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// A cloud recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Upstream identifier.
    pub id: String,
    /// Room the recording was made in.
    #[serde(default)]
    pub room_name: String,
    /// Recording status, e.g. `finished` or `in-progress`.
    #[serde(default)]
    pub status: String,
    /// Start time as a Unix timestamp in seconds.
    #[serde(default)]
    pub start_ts: u64,
    /// Length in seconds.
    #[serde(default)]
    pub duration: u64,
    /// Everything else upstream reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
