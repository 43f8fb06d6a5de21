//! Recency-sorted room list owned by the UI thread.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use roomlist_core::{
    AvatarImage, DEFAULT_SORT_DELAY_MS, EventStream, ImageCache, LastMessage, RoomInfo,
    RoomListChannels, RoomListEvent, SortDebouncer, SortDecision, ThumbnailClient,
    ThumbnailRequest, apply_order, recency_order,
    types::{DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH},
};
use tracing::{debug, info, trace, warn};

use crate::avatar::{AvatarFetch, AvatarReceiver, AvatarSender, avatar_channel, decode_avatar};

/// Tuning values for [`RoomListView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomListSettings {
    /// Delay between the pointer leaving the list and a deferred re-sort.
    pub sort_delay_ms: u64,
    /// Requested avatar thumbnail width.
    pub thumbnail_width: u32,
    /// Requested avatar thumbnail height.
    pub thumbnail_height: u32,
}

impl Default for RoomListSettings {
    fn default() -> Self {
        Self {
            sort_delay_ms: DEFAULT_SORT_DELAY_MS,
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            thumbnail_height: DEFAULT_THUMBNAIL_HEIGHT,
        }
    }
}

/// One row of the room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    pub room_id: String,
    pub name: String,
    pub topic: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar: Option<AvatarImage>,
    pub is_invite: bool,
    pub unread_count: u64,
    pub is_read: bool,
    pub last_message: Option<LastMessage>,
    pub is_visible: bool,
    pub is_selected: bool,
}

impl RoomEntry {
    fn new(room_id: &str, info: &RoomInfo, is_invite: bool) -> Self {
        Self {
            room_id: room_id.to_owned(),
            name: info.name.clone(),
            topic: info.topic.clone(),
            avatar_url: non_empty_url(info),
            avatar: None,
            is_invite,
            unread_count: 0,
            is_read: true,
            last_message: info.last_message.clone(),
            is_visible: true,
            is_selected: false,
        }
    }

    /// Name to render, falling back to the room ID.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.room_id
        } else {
            &self.name
        }
    }

    fn recency_key(&self) -> Option<u64> {
        self.last_message.as_ref().and_then(LastMessage::recency_key)
    }
}

/// Room collection plus its display order, selection and filter state.
///
/// Every room ID in the display order exists in the collection and vice
/// versa. The selected room, when set, is always present.
pub struct RoomListView {
    cache: Arc<dyn ImageCache>,
    client: Arc<dyn ThumbnailClient>,
    settings: RoomListSettings,
    channels: RoomListChannels,
    rooms: BTreeMap<String, RoomEntry>,
    display: Vec<String>,
    selected_room_id: Option<String>,
    scroll_request: Option<String>,
    debouncer: SortDebouncer,
    avatar_tx: AvatarSender,
    avatar_rx: AvatarReceiver,
}

impl RoomListView {
    /// Create an empty room list backed by the given collaborators.
    pub fn new(
        cache: Arc<dyn ImageCache>,
        client: Arc<dyn ThumbnailClient>,
        settings: RoomListSettings,
    ) -> Self {
        let (avatar_tx, avatar_rx) = avatar_channel();
        Self {
            cache,
            client,
            settings,
            channels: RoomListChannels::default(),
            rooms: BTreeMap::new(),
            display: Vec::new(),
            selected_room_id: None,
            scroll_request: None,
            debouncer: SortDebouncer::new(settings.sort_delay_ms),
            avatar_tx,
            avatar_rx,
        }
    }

    /// Subscribe to emitted room list events.
    pub fn subscribe(&self) -> EventStream {
        self.channels.subscribe()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomEntry> {
        self.rooms.get(room_id)
    }

    /// Room IDs in display order, including hidden rooms.
    pub fn display_order(&self) -> &[String] {
        &self.display
    }

    /// Visible rooms in display order.
    pub fn visible_rooms(&self) -> Vec<&RoomEntry> {
        self.display
            .iter()
            .filter_map(|room_id| self.rooms.get(room_id))
            .filter(|entry| entry.is_visible)
            .collect()
    }

    pub fn selected_room_id(&self) -> Option<&str> {
        self.selected_room_id.as_deref()
    }

    /// Room the UI should scroll into view, consumed on read.
    pub fn take_scroll_request(&mut self) -> Option<String> {
        self.scroll_request.take()
    }

    /// Sum of unread counts across all rooms, saturating at `u64::MAX`.
    pub fn total_unread(&self) -> u64 {
        self.rooms
            .values()
            .fold(0u64, |total, entry| total.saturating_add(entry.unread_count))
    }

    pub fn is_sort_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Deadline of the armed deferred sort, if any.
    pub fn next_sort_deadline_ms(&self) -> Option<u64> {
        self.debouncer.due_at_ms()
    }

    /// Replace the whole list, sort it once and select the first room.
    pub fn initialize(&mut self, rooms: &BTreeMap<String, RoomInfo>) {
        info!(room_count = rooms.len(), "initialize room list");

        self.rooms.clear();
        self.display.clear();
        self.selected_room_id = None;
        self.scroll_request = None;

        for (room_id, info) in rooms {
            if info.is_invite {
                self.add_invited_room(room_id, info);
            } else {
                self.add_room(room_id, info);
            }
        }
        self.sort_by_recency();

        if let Some(first) = self.rooms.keys().next().cloned() {
            self.select_room(&first);
        }
    }

    /// Insert a joined room. An existing ID is updated in place.
    pub fn add_room(&mut self, room_id: &str, info: &RoomInfo) {
        self.insert_room(room_id, info, false);
    }

    /// Insert an invited room. An existing ID is updated in place.
    pub fn add_invited_room(&mut self, room_id: &str, info: &RoomInfo) {
        self.insert_room(room_id, info, true);
    }

    /// Update an existing room or add it when unknown.
    pub fn update_room(&mut self, room_id: &str, info: &RoomInfo) {
        if !self.rooms.contains_key(room_id) {
            self.insert_room(room_id, info, info.is_invite);
            return;
        }
        self.refresh_room(room_id, info, info.is_invite);
    }

    /// Apply `update_room` for every entry of a sync batch.
    pub fn sync(&mut self, rooms: &BTreeMap<String, RoomInfo>) {
        trace!(room_count = rooms.len(), "sync room list");
        for (room_id, info) in rooms {
            self.update_room(room_id, info);
        }
    }

    /// Remove a room; with `reset_selection` the first remaining room is selected.
    pub fn remove_room(&mut self, room_id: &str, reset_selection: bool) {
        if !self.remove_entry(room_id) {
            warn!(%room_id, "remove on unknown room_id");
            return;
        }

        if !reset_selection {
            return;
        }
        if let Some(first) = self.rooms.keys().next().cloned() {
            self.select_room(&first);
        }
    }

    /// Set a room's unread count and publish the new total.
    pub fn update_unread_count(&mut self, room_id: &str, count: u64) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            warn!(%room_id, "update_unread_count: unknown room_id");
            return;
        };
        entry.unread_count = count;

        let total = self.total_unread();
        debug!(%room_id, count, total, "unread count updated");
        self.channels
            .emit(RoomListEvent::TotalUnreadChanged { total });
    }

    /// Apply read-state flags; unknown rooms are skipped.
    pub fn update_read_status(&mut self, status: &BTreeMap<String, bool>) {
        for (room_id, is_read) in status {
            if let Some(entry) = self.rooms.get_mut(room_id) {
                entry.is_read = *is_read;
            }
        }
    }

    /// Drop invites that are no longer reported upstream.
    ///
    /// An empty `invites` map means nothing was reported and keeps every room.
    /// Returns the number of removed rooms.
    pub fn cleanup_invites(&mut self, invites: &BTreeMap<String, bool>) -> usize {
        if invites.is_empty() {
            return 0;
        }

        let stale: Vec<String> = self
            .rooms
            .values()
            .filter(|entry| entry.is_invite && !invites.contains_key(&entry.room_id))
            .map(|entry| entry.room_id.clone())
            .collect();
        for room_id in &stale {
            self.remove_entry(room_id);
        }
        if !stale.is_empty() {
            debug!(removed = stale.len(), "cleaned up stale invites");
        }
        stale.len()
    }

    /// Show only rooms in `allowed` and keep the selection on a visible room.
    pub fn apply_filter(&mut self, allowed: &HashSet<String>) {
        for entry in self.rooms.values_mut() {
            entry.is_visible = allowed.contains(&entry.room_id);
        }

        if self
            .selected_room_id
            .as_ref()
            .is_some_and(|selected| allowed.contains(selected))
        {
            return;
        }
        self.select_first_visible_room();
    }

    /// Make every room visible again.
    pub fn remove_filter(&mut self) {
        for entry in self.rooms.values_mut() {
            entry.is_visible = true;
        }
    }

    /// Select a room, deselecting every other room.
    pub fn select_room(&mut self, room_id: &str) {
        if !self.rooms.contains_key(room_id) {
            warn!(%room_id, "select on unknown room_id");
            return;
        }

        for entry in self.rooms.values_mut() {
            entry.is_selected = entry.room_id == room_id;
        }
        self.selected_room_id = Some(room_id.to_owned());
        self.scroll_request = Some(room_id.to_owned());
        debug!(%room_id, "room selected");
        self.channels.emit(RoomListEvent::SelectionChanged {
            room_id: room_id.to_owned(),
        });
    }

    /// Store a room's last message and re-sort unless the pointer is over the list.
    pub fn update_room_description(&mut self, room_id: &str, message: LastMessage) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            warn!(%room_id, body = %message.body, "description update on unknown room_id");
            return;
        };
        entry.last_message = Some(message);

        match self.debouncer.on_description_updated() {
            SortDecision::Immediate => self.sort_by_recency(),
            SortDecision::Deferred => trace!(%room_id, "pointer over room list; sort deferred"),
        }
    }

    /// Reorder rooms by descending last-message time.
    pub fn sort_by_recency(&mut self) {
        self.debouncer.mark_sorted();

        let rooms = &self.rooms;
        let target = recency_order(&self.display, |room_id| {
            rooms.get(room_id).and_then(RoomEntry::recency_key)
        });
        let moves = apply_order(&mut self.display, &target);
        trace!(moves, "sorted room list by last message");

        if moves > 0 {
            self.channels.emit(RoomListEvent::OrderChanged {
                order: self.display.clone(),
            });
        }
    }

    pub fn pointer_entered(&mut self) {
        self.debouncer.pointer_entered();
    }

    /// Pointer left the list; a pending sort runs after the configured delay.
    pub fn pointer_left(&mut self, now_ms: u64) {
        self.debouncer.pointer_left(now_ms);
        if let Some(due_at_ms) = self.debouncer.due_at_ms() {
            trace!(due_at_ms, "deferred sort armed");
        }
    }

    /// Run the deferred sort if its deadline passed. Returns `true` when it ran.
    pub fn poll_sort(&mut self, now_ms: u64) -> bool {
        if self.debouncer.poll(now_ms) {
            self.sort_by_recency();
            true
        } else {
            false
        }
    }

    /// Apply a decoded avatar to a room and publish it.
    pub fn update_room_avatar(&mut self, room_id: &str, avatar: AvatarImage) {
        let Some(entry) = self.rooms.get_mut(room_id) else {
            warn!(%room_id, "avatar update on unknown room_id");
            return;
        };
        entry.avatar = Some(avatar.clone());
        self.channels.emit(RoomListEvent::AvatarChanged {
            room_id: room_id.to_owned(),
            avatar,
        });
    }

    /// Apply thumbnails fetched since the last call. Returns how many were applied.
    pub fn drain_avatar_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(fetch) = self.avatar_rx.try_recv() {
            if self.apply_avatar_fetch(fetch) {
                applied += 1;
            }
        }
        applied
    }

    /// Ask the application to leave a room.
    pub fn request_leave(&mut self, room_id: &str) {
        if !self.rooms.contains_key(room_id) {
            warn!(%room_id, "leave requested for unknown room_id");
            return;
        }
        self.channels.emit(RoomListEvent::LeaveRequested {
            room_id: room_id.to_owned(),
        });
    }

    /// Ask the application to join a room by ID or alias.
    pub fn request_join(&mut self, room_alias: &str) {
        let room_alias = room_alias.trim();
        if room_alias.is_empty() {
            warn!("join requested with empty room alias");
            return;
        }
        self.channels.emit(RoomListEvent::JoinRequested {
            room_alias: room_alias.to_owned(),
        });
    }

    pub fn accept_invite(&mut self, room_id: &str) {
        if self.require_invite(room_id, "accept") {
            self.channels.emit(RoomListEvent::InviteAccepted {
                room_id: room_id.to_owned(),
            });
        }
    }

    pub fn decline_invite(&mut self, room_id: &str) {
        if self.require_invite(room_id, "decline") {
            self.channels.emit(RoomListEvent::InviteDeclined {
                room_id: room_id.to_owned(),
            });
        }
    }

    fn insert_room(&mut self, room_id: &str, info: &RoomInfo, is_invite: bool) {
        if self.rooms.contains_key(room_id) {
            debug!(%room_id, "room already listed; updating in place");
            self.refresh_room(room_id, info, is_invite);
            return;
        }

        let entry = RoomEntry::new(room_id, info, is_invite);
        let avatar_url = entry.avatar_url.clone();
        self.rooms.insert(room_id.to_owned(), entry);
        self.display.push(room_id.to_owned());
        trace!(%room_id, is_invite, "room added");

        if let Some(url) = avatar_url {
            self.request_avatar(room_id, &url);
        }
    }

    fn refresh_room(&mut self, room_id: &str, info: &RoomInfo, is_invite: bool) {
        let new_url = non_empty_url(info);
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return;
        };
        entry.name = info.name.clone();
        entry.topic = info.topic.clone();
        entry.is_invite = is_invite;

        let needs_fetch = match &new_url {
            Some(url) => entry.avatar_url.as_ref() != Some(url) || entry.avatar.is_none(),
            None => false,
        };
        if new_url.is_some() {
            entry.avatar_url = new_url.clone();
        }

        if needs_fetch && let Some(url) = new_url {
            self.request_avatar(room_id, &url);
        }
    }

    fn remove_entry(&mut self, room_id: &str) -> bool {
        if self.rooms.remove(room_id).is_none() {
            return false;
        }
        self.display.retain(|id| id != room_id);
        if self.selected_room_id.as_deref() == Some(room_id) {
            self.selected_room_id = None;
        }
        if self.scroll_request.as_deref() == Some(room_id) {
            self.scroll_request = None;
        }
        trace!(%room_id, "room removed");
        true
    }

    fn select_first_visible_room(&mut self) {
        let first_visible = self
            .display
            .iter()
            .find(|room_id| {
                self.rooms
                    .get(room_id.as_str())
                    .is_some_and(|entry| entry.is_visible)
            })
            .cloned();
        if let Some(room_id) = first_visible {
            self.select_room(&room_id);
        }
    }

    fn require_invite(&self, room_id: &str, action: &str) -> bool {
        match self.rooms.get(room_id) {
            Some(entry) if entry.is_invite => true,
            Some(_) => {
                warn!(%room_id, action, "invite action on a joined room");
                false
            }
            None => {
                warn!(%room_id, action, "invite action on unknown room_id");
                false
            }
        }
    }

    fn request_avatar(&mut self, room_id: &str, url: &str) {
        if let Some(bytes) = self.cache.image(url) {
            trace!(%room_id, %url, "room avatar served from cache");
            match decode_avatar(url, &bytes) {
                Ok(avatar) => self.update_room_avatar(room_id, avatar),
                Err(err) => warn!(%room_id, %url, error = %err, "cached room avatar is undecodable"),
            }
            return;
        }

        let request = ThumbnailRequest::new(url)
            .with_size(self.settings.thumbnail_width, self.settings.thumbnail_height);
        let avatar_tx = self.avatar_tx.clone();
        let cache = Arc::clone(&self.cache);
        let room_id = room_id.to_owned();
        let url = url.to_owned();
        debug!(%room_id, %url, "fetching room avatar");
        self.client.get_thumbnail(
            request,
            Box::new(move |result| match result {
                Ok(bytes) => {
                    // Persisted off the owning thread; only decoding happens there.
                    if let Err(err) = cache.save_image(&url, &bytes) {
                        warn!(%url, error = %err, "failed to cache room avatar");
                    }
                    let _ = avatar_tx.send(AvatarFetch {
                        room_id,
                        url,
                        bytes,
                    });
                }
                Err(err) => {
                    warn!(
                        mxc_url = %url,
                        code = %err.code,
                        message = %err.message,
                        "failed to download room avatar"
                    );
                }
            }),
        );
    }

    fn apply_avatar_fetch(&mut self, fetch: AvatarFetch) -> bool {
        let AvatarFetch {
            room_id,
            url,
            bytes,
        } = fetch;

        let still_current = self
            .rooms
            .get(&room_id)
            .is_some_and(|entry| entry.avatar_url.as_deref() == Some(url.as_str()));
        if !still_current {
            debug!(%room_id, %url, "dropping avatar for removed or changed room");
            return false;
        }

        match decode_avatar(&url, &bytes) {
            Ok(avatar) => {
                self.update_room_avatar(&room_id, avatar);
                true
            }
            Err(err) => {
                warn!(%room_id, %url, error = %err, "fetched room avatar is undecodable");
                false
            }
        }
    }
}

fn non_empty_url(info: &RoomInfo) -> Option<String> {
    info.avatar_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use roomlist_core::{MediaError, ThumbnailCallback};
    use roomlist_platform::InMemoryImageCache;

    use super::*;
    use crate::avatar::png_bytes;

    #[derive(Default)]
    struct QueuedThumbnailClient {
        queued: Mutex<Vec<(ThumbnailRequest, ThumbnailCallback)>>,
    }

    impl QueuedThumbnailClient {
        fn requested_urls(&self) -> Vec<String> {
            self.queued
                .lock()
                .expect("queue lock")
                .iter()
                .map(|(request, _)| request.mxc_url.clone())
                .collect()
        }

        fn take(&self) -> Vec<(ThumbnailRequest, ThumbnailCallback)> {
            std::mem::take(&mut *self.queued.lock().expect("queue lock"))
        }
    }

    impl ThumbnailClient for QueuedThumbnailClient {
        fn get_thumbnail(&self, request: ThumbnailRequest, callback: ThumbnailCallback) {
            self.queued
                .lock()
                .expect("queue lock")
                .push((request, callback));
        }
    }

    struct Harness {
        view: RoomListView,
        cache: InMemoryImageCache,
        client: Arc<QueuedThumbnailClient>,
        events: EventStream,
    }

    impl Harness {
        fn new() -> Self {
            let cache = InMemoryImageCache::default();
            let client = Arc::new(QueuedThumbnailClient::default());
            let view = RoomListView::new(
                Arc::new(cache.clone()),
                Arc::clone(&client) as Arc<dyn ThumbnailClient>,
                RoomListSettings::default(),
            );
            let events = view.subscribe();
            Self {
                view,
                cache,
                client,
                events,
            }
        }

        fn drain_events(&mut self) -> Vec<RoomListEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn info(name: &str) -> RoomInfo {
        RoomInfo {
            name: name.to_owned(),
            ..RoomInfo::default()
        }
    }

    fn invite(name: &str) -> RoomInfo {
        RoomInfo {
            is_invite: true,
            ..info(name)
        }
    }

    fn message(sender: &str, timestamp_ms: u64) -> LastMessage {
        LastMessage {
            sender: sender.to_owned(),
            body: "hello".to_owned(),
            timestamp_ms,
            ..LastMessage::default()
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn assert_bijection(view: &RoomListView) {
        assert_eq!(view.display_order().len(), view.len());
        for room_id in view.display_order() {
            assert!(view.room(room_id).is_some(), "{room_id} missing from rooms");
        }
    }

    #[test]
    fn add_and_remove_keep_display_and_rooms_in_bijection() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_invited_room("!b", &info("B"));
        h.view.add_room("!c", &info("C"));
        assert_bijection(&h.view);
        assert!(h.view.room("!b").expect("invite listed").is_invite);

        h.view.remove_room("!b", false);
        h.view.remove_room("!zz", false);
        h.view.add_room("!d", &info("D"));
        assert_bijection(&h.view);
        assert_eq!(h.view.display_order(), ids(&["!a", "!c", "!d"]).as_slice());
    }

    #[test]
    fn adding_existing_room_updates_in_place() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));
        h.view.add_room("!a", &info("A renamed"));

        assert_eq!(h.view.display_order(), ids(&["!a", "!b"]).as_slice());
        assert_eq!(h.view.room("!a").expect("room a").name, "A renamed");
    }

    #[test]
    fn update_room_adds_unknown_rooms_by_invite_flag() {
        let mut h = Harness::new();
        h.view.update_room("!inv", &invite("Invite"));
        h.view.update_room("!joined", &info("Joined"));

        assert!(h.view.room("!inv").expect("invite").is_invite);
        assert!(!h.view.room("!joined").expect("joined").is_invite);

        h.view.update_room("!inv", &info("Now joined"));
        let entry = h.view.room("!inv").expect("room");
        assert!(!entry.is_invite);
        assert_eq!(entry.display_name(), "Now joined");
    }

    #[test]
    fn remove_with_reset_selects_first_room_in_collection_order() {
        let mut h = Harness::new();
        h.view.add_room("!c", &info("C"));
        h.view.add_room("!b", &info("B"));
        h.view.add_room("!a", &info("A"));
        h.view.select_room("!a");
        h.drain_events();

        h.view.remove_room("!a", true);
        assert_eq!(h.view.selected_room_id(), Some("!b"));
        assert_eq!(
            h.drain_events(),
            vec![RoomListEvent::SelectionChanged {
                room_id: "!b".to_owned()
            }]
        );
    }

    #[test]
    fn remove_with_reset_on_last_room_leaves_nothing_selected() {
        let mut h = Harness::new();
        h.view.add_room("!only", &info("Only"));
        h.view.select_room("!only");
        h.drain_events();

        h.view.remove_room("!only", true);
        assert!(h.view.is_empty());
        assert!(h.view.display_order().is_empty());
        assert_eq!(h.view.selected_room_id(), None);
        assert!(h.drain_events().is_empty());
    }

    #[test]
    fn sync_updates_known_rooms_and_adds_new_ones() {
        let mut h = Harness::new();
        h.view.add_room("!known", &info("Old name"));
        h.view.add_invited_room("!inv", &invite("Invite"));

        let batch = BTreeMap::from([
            ("!known".to_owned(), info("New name")),
            ("!inv".to_owned(), info("Joined now")),
            ("!new".to_owned(), invite("Fresh invite")),
        ]);
        h.view.sync(&batch);

        assert_eq!(h.view.len(), 3);
        assert_bijection(&h.view);
        assert_eq!(h.view.room("!known").expect("known").display_name(), "New name");
        assert!(!h.view.room("!inv").expect("inv").is_invite);
        assert!(h.view.room("!new").expect("new").is_invite);
        assert_eq!(h.view.display_order().last().map(String::as_str), Some("!new"));
    }

    #[test]
    fn removing_selected_room_without_reset_clears_selection() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.select_room("!a");
        h.view.remove_room("!a", false);
        assert_eq!(h.view.selected_room_id(), None);
    }

    #[test]
    fn unread_total_is_published_and_unknown_rooms_are_ignored() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));

        h.view.update_unread_count("!a", 3);
        h.view.update_unread_count("!b", 4);
        h.view.update_unread_count("!missing", 10);

        assert_eq!(h.view.total_unread(), 7);
        assert_eq!(
            h.drain_events(),
            vec![
                RoomListEvent::TotalUnreadChanged { total: 3 },
                RoomListEvent::TotalUnreadChanged { total: 7 },
            ]
        );
    }

    #[test]
    fn unread_total_saturates_instead_of_overflowing() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));

        h.view.update_unread_count("!a", u64::MAX);
        h.view.update_unread_count("!b", 1);

        assert_eq!(h.view.total_unread(), u64::MAX);
        assert_eq!(
            h.drain_events().last(),
            Some(&RoomListEvent::TotalUnreadChanged { total: u64::MAX })
        );
    }

    #[test]
    fn read_status_skips_unknown_rooms() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        let status = BTreeMap::from([("!a".to_owned(), false), ("!ghost".to_owned(), true)]);
        h.view.update_read_status(&status);

        assert!(!h.view.room("!a").expect("room a").is_read);
        assert!(h.view.room("!ghost").is_none());
    }

    #[test]
    fn cleanup_invites_keeps_reported_invites_and_joined_rooms() {
        let mut h = Harness::new();
        h.view.add_invited_room("!a", &invite("A"));
        h.view.add_invited_room("!b", &invite("B"));
        h.view.add_room("!c", &info("C"));

        let removed = h
            .view
            .cleanup_invites(&BTreeMap::from([("!a".to_owned(), true)]));

        assert_eq!(removed, 1);
        assert!(h.view.room("!a").is_some());
        assert!(h.view.room("!b").is_none());
        assert!(h.view.room("!c").is_some());
        assert_bijection(&h.view);
    }

    #[test]
    fn cleanup_invites_with_empty_report_is_noop() {
        let mut h = Harness::new();
        h.view.add_invited_room("!a", &invite("A"));
        assert_eq!(h.view.cleanup_invites(&BTreeMap::new()), 0);
        assert_eq!(h.view.len(), 1);
    }

    #[test]
    fn filter_hides_disallowed_rooms_and_moves_selection() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));
        h.view.add_room("!c", &info("C"));
        h.view.update_room_description("!c", message("@bob:example.org", 20));
        h.view.update_room_description("!a", message("@bob:example.org", 10));
        h.view.select_room("!b");

        let allowed = HashSet::from(["!a".to_owned(), "!c".to_owned()]);
        h.view.apply_filter(&allowed);

        assert!(h.view.room("!a").expect("a").is_visible);
        assert!(!h.view.room("!b").expect("b").is_visible);
        assert!(h.view.room("!c").expect("c").is_visible);
        assert_eq!(h.view.selected_room_id(), Some("!c"));
        assert!(!h.view.room("!b").expect("b").is_selected);

        h.view.remove_filter();
        assert_eq!(h.view.visible_rooms().len(), 3);
    }

    #[test]
    fn filter_keeps_allowed_selection() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));
        h.view.select_room("!b");
        h.drain_events();

        h.view.apply_filter(&HashSet::from(["!b".to_owned()]));
        assert_eq!(h.view.selected_room_id(), Some("!b"));
        assert!(h.drain_events().is_empty());
    }

    #[test]
    fn selecting_unknown_room_changes_nothing() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.select_room("!a");
        h.drain_events();

        h.view.select_room("!nope");
        assert_eq!(h.view.selected_room_id(), Some("!a"));
        assert!(h.drain_events().is_empty());
    }

    #[test]
    fn selecting_room_deselects_others_and_requests_scroll() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));
        h.view.select_room("!a");
        h.view.select_room("!b");

        assert!(!h.view.room("!a").expect("a").is_selected);
        assert!(h.view.room("!b").expect("b").is_selected);
        assert_eq!(h.view.take_scroll_request().as_deref(), Some("!b"));
        assert_eq!(h.view.take_scroll_request(), None);
    }

    #[test]
    fn sort_puts_recent_rooms_first_and_silent_rooms_last() {
        let mut h = Harness::new();
        h.view.add_room("!silent", &info("Silent"));
        h.view.add_room("!old", &info("Old"));
        h.view.add_room("!new", &info("New"));
        h.view.add_room("!notice", &info("Notice"));
        h.view.update_room_description("!old", message("@a:example.org", 100));
        h.view.update_room_description("!new", message("@b:example.org", 200));
        h.view.update_room_description("!notice", message("", 999));

        assert_eq!(
            h.view.display_order(),
            ids(&["!new", "!old", "!silent", "!notice"]).as_slice()
        );

        let before = h.view.display_order().to_vec();
        h.drain_events();
        h.view.sort_by_recency();
        assert_eq!(h.view.display_order(), before.as_slice());
        assert!(h.drain_events().is_empty());
    }

    #[test]
    fn hover_defers_sort_until_leave_delay_elapses() {
        let mut h = Harness::new();
        h.view.add_room("!a", &info("A"));
        h.view.add_room("!b", &info("B"));
        h.drain_events();

        h.view.pointer_entered();
        h.view.update_room_description("!b", message("@x:example.org", 10));
        h.view.update_room_description("!b", message("@x:example.org", 20));
        assert!(h.view.is_sort_pending());
        assert_eq!(h.view.display_order(), ids(&["!a", "!b"]).as_slice());

        h.view.pointer_left(1_000);
        assert_eq!(h.view.next_sort_deadline_ms(), Some(1_700));
        assert!(!h.view.poll_sort(1_500));
        assert!(h.view.poll_sort(1_700));
        assert!(!h.view.poll_sort(2_500));

        assert_eq!(h.view.display_order(), ids(&["!b", "!a"]).as_slice());
        let order_events = h
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, RoomListEvent::OrderChanged { .. }))
            .count();
        assert_eq!(order_events, 1);
    }

    #[test]
    fn initialize_replaces_rooms_sorts_and_selects_first() {
        let mut h = Harness::new();
        h.view.add_room("!stale", &info("Stale"));

        let rooms = BTreeMap::from([
            (
                "!a".to_owned(),
                RoomInfo {
                    last_message: Some(message("@x:example.org", 5)),
                    ..info("A")
                },
            ),
            (
                "!b".to_owned(),
                RoomInfo {
                    last_message: Some(message("@x:example.org", 50)),
                    ..info("B")
                },
            ),
            ("!c".to_owned(), invite("C")),
        ]);
        h.view.initialize(&rooms);

        assert!(h.view.room("!stale").is_none());
        assert_eq!(h.view.display_order(), ids(&["!b", "!a", "!c"]).as_slice());
        assert!(h.view.room("!c").expect("c").is_invite);
        assert_eq!(h.view.selected_room_id(), Some("!a"));
    }

    #[test]
    fn cached_avatar_is_applied_without_network() {
        let mut h = Harness::new();
        h.cache
            .save_image("mxc://example.org/cached", &png_bytes(2, 2))
            .expect("seed cache");

        h.view.add_room(
            "!a",
            &RoomInfo {
                avatar_url: Some("mxc://example.org/cached".to_owned()),
                ..info("A")
            },
        );

        assert!(h.client.requested_urls().is_empty());
        assert!(h.view.room("!a").expect("a").avatar.is_some());
        assert!(matches!(
            h.drain_events().as_slice(),
            [RoomListEvent::AvatarChanged { room_id, .. }] if room_id == "!a"
        ));
    }

    #[test]
    fn fetched_avatar_is_marshalled_cached_and_applied() {
        let mut h = Harness::new();
        h.view.add_room(
            "!a",
            &RoomInfo {
                avatar_url: Some("mxc://example.org/remote".to_owned()),
                ..info("A")
            },
        );
        assert_eq!(h.client.requested_urls(), ids(&["mxc://example.org/remote"]));
        assert!(h.view.room("!a").expect("a").avatar.is_none());

        let pending = h.client.take();
        std::thread::spawn(move || {
            for (_, callback) in pending {
                callback(Ok(png_bytes(4, 4)));
            }
        })
        .join()
        .expect("worker thread should finish");

        assert!(
            h.cache.image("mxc://example.org/remote").is_some(),
            "avatar is cached by the completion callback"
        );
        assert!(h.view.room("!a").expect("a").avatar.is_none());
        assert_eq!(h.view.drain_avatar_updates(), 1);
        let avatar = h.view.room("!a").expect("a").avatar.clone().expect("avatar");
        assert_eq!((avatar.width, avatar.height), (4, 4));
        assert!(h.cache.image("mxc://example.org/remote").is_some());
    }

    #[test]
    fn failed_fetch_leaves_room_without_avatar() {
        let mut h = Harness::new();
        h.view.add_room(
            "!a",
            &RoomInfo {
                avatar_url: Some("mxc://example.org/missing".to_owned()),
                ..info("A")
            },
        );
        for (request, callback) in h.client.take() {
            callback(Err(MediaError::not_found(&request.mxc_url)));
        }

        assert_eq!(h.view.drain_avatar_updates(), 0);
        assert!(h.view.room("!a").expect("a").avatar.is_none());
    }

    #[test]
    fn late_avatar_for_removed_room_is_cached_but_dropped() {
        let mut h = Harness::new();
        h.view.add_room(
            "!a",
            &RoomInfo {
                avatar_url: Some("mxc://example.org/late".to_owned()),
                ..info("A")
            },
        );
        let pending = h.client.take();
        h.view.remove_room("!a", false);
        for (_, callback) in pending {
            callback(Ok(png_bytes(1, 1)));
        }

        assert_eq!(h.view.drain_avatar_updates(), 0);
        assert!(h.cache.image("mxc://example.org/late").is_some());
    }

    #[test]
    fn invite_actions_require_an_invited_room() {
        let mut h = Harness::new();
        h.view.add_invited_room("!inv", &invite("Invite"));
        h.view.add_room("!joined", &info("Joined"));

        h.view.accept_invite("!inv");
        h.view.decline_invite("!joined");
        h.view.decline_invite("!ghost");
        h.view.request_leave("!joined");
        h.view.request_join("  #rust:example.org ");
        h.view.request_join("   ");

        assert_eq!(
            h.drain_events(),
            vec![
                RoomListEvent::InviteAccepted {
                    room_id: "!inv".to_owned()
                },
                RoomListEvent::LeaveRequested {
                    room_id: "!joined".to_owned()
                },
                RoomListEvent::JoinRequested {
                    room_alias: "#rust:example.org".to_owned()
                },
            ]
        );
    }
}
