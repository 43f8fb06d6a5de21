use serde::{Deserialize, Serialize};

/// Default thumbnail width requested for room avatars.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 800;
/// Default thumbnail height requested for room avatars.
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 600;

/// Most recent message shown under a room name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LastMessage {
    /// Sender user ID. Empty when the event was not a room message.
    pub sender: String,
    /// Optional sender display name.
    #[serde(default)]
    pub sender_display_name: Option<String>,
    /// Display-ready body text.
    pub body: String,
    /// Event timestamp in milliseconds since Unix epoch.
    pub timestamp_ms: u64,
}

impl LastMessage {
    /// Ranking key used by the recency sort.
    ///
    /// `None` when there is no sender, so such rooms sort after every room
    /// with a real message.
    pub fn recency_key(&self) -> Option<u64> {
        if self.sender.is_empty() {
            None
        } else {
            Some(self.timestamp_ms)
        }
    }
}

/// Room metadata delivered by sync/cache layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoomInfo {
    /// Best-effort display name for the room.
    pub name: String,
    /// Optional room topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Optional `mxc://` avatar reference.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the user is invited but has not joined yet.
    #[serde(default)]
    pub is_invite: bool,
    /// Last room message, when known.
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

/// Cropped thumbnail request sent to a [`ThumbnailClient`](crate::media::ThumbnailClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThumbnailRequest {
    /// `mxc://` source URI.
    pub mxc_url: String,
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in pixels.
    pub height: u32,
}

impl ThumbnailRequest {
    /// Build a request with default dimensions.
    pub fn new(mxc_url: impl Into<String>) -> Self {
        Self {
            mxc_url: mxc_url.into(),
            width: DEFAULT_THUMBNAIL_WIDTH,
            height: DEFAULT_THUMBNAIL_HEIGHT,
        }
    }

    /// Override requested dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }
}

/// Decoded room avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    /// Source `mxc://` URI.
    pub source: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 pixel buffer, row-major.
    pub rgba: Vec<u8>,
}

/// Notification emitted by the room list to interested collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListEvent {
    /// The selected room changed.
    SelectionChanged {
        /// Newly selected room ID.
        room_id: String,
    },
    /// A room avatar finished loading.
    AvatarChanged {
        /// Target room ID.
        room_id: String,
        /// Decoded avatar.
        avatar: AvatarImage,
    },
    /// Sum of unread counts across all rooms changed.
    TotalUnreadChanged {
        /// New aggregate unread count.
        total: u64,
    },
    /// Display order was re-derived and differs from the previous one.
    OrderChanged {
        /// Room IDs in display order.
        order: Vec<String>,
    },
    /// User asked to leave a room.
    LeaveRequested {
        /// Target room ID.
        room_id: String,
    },
    /// User asked to join a room by ID or alias.
    JoinRequested {
        /// Room ID or alias as typed by the user.
        room_alias: String,
    },
    /// User accepted an invite.
    InviteAccepted {
        /// Invited room ID.
        room_id: String,
    },
    /// User declined an invite.
    InviteDeclined {
        /// Invited room ID.
        room_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_without_sender_has_no_recency_key() {
        let message = LastMessage {
            sender: String::new(),
            body: "topic changed".to_owned(),
            timestamp_ms: 1_700_000_000_000,
            ..LastMessage::default()
        };
        assert_eq!(message.recency_key(), None);
    }

    #[test]
    fn thumbnail_request_clamps_zero_dimensions() {
        let request = ThumbnailRequest::new("mxc://example.org/abc").with_size(0, 64);
        assert_eq!((request.width, request.height), (1, 64));
    }

    #[test]
    fn room_info_accepts_minimal_json() {
        let info: RoomInfo =
            serde_json::from_str(r#"{"name":"Lobby"}"#).expect("minimal room info should parse");
        assert_eq!(info.name, "Lobby");
        assert!(!info.is_invite);
        assert!(info.avatar_url.is_none());
    }
}
