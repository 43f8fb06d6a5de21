//! Room list view model: collection, display order, selection, filtering,
//! avatars and hover-debounced recency sorting.

/// Avatar decoding and fetch hand-off.
pub mod avatar;
/// The room list itself.
pub mod room_list;

pub use avatar::{AvatarFetch, decode_avatar};
pub use room_list::{RoomEntry, RoomListSettings, RoomListView};
