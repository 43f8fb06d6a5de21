//! Core room list contract shared by the view and its collaborators.
//!
//! This crate defines room payloads, the event protocol, media/cache traits,
//! recency ordering and hover-aware sort debouncing.

/// Room list event fan-out channel.
pub mod channel;
/// Hover-aware debouncing of re-sorts.
pub mod debounce;
/// Media and cache error types.
pub mod error;
/// Image cache and thumbnail client contracts.
pub mod media;
/// Recency ordering of the display sequence.
pub mod ordering;
/// Room payloads, requests and events.
pub mod types;

pub use channel::{EventStream, RoomListChannels};
pub use debounce::{DEFAULT_SORT_DELAY_MS, SortDebouncer, SortDecision};
pub use error::{CacheError, MediaError, MediaErrorCategory};
pub use media::{ImageCache, ThumbnailCallback, ThumbnailClient};
pub use ordering::{apply_order, recency_order};
pub use types::{AvatarImage, LastMessage, RoomInfo, RoomListEvent, ThumbnailRequest};
