//! Replay script format and step dispatch.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use roomlist_core::{LastMessage, RoomInfo};
use roomlist_view::RoomListView;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a replay script.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One scripted room list interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Initialize {
        rooms: BTreeMap<String, RoomInfo>,
    },
    AddRoom {
        room_id: String,
        info: RoomInfo,
    },
    AddInvitedRoom {
        room_id: String,
        info: RoomInfo,
    },
    UpdateRoom {
        room_id: String,
        info: RoomInfo,
    },
    RemoveRoom {
        room_id: String,
        #[serde(default)]
        reset_selection: bool,
    },
    Sync {
        rooms: BTreeMap<String, RoomInfo>,
    },
    UpdateUnreadCount {
        room_id: String,
        count: u64,
    },
    UpdateReadStatus {
        status: BTreeMap<String, bool>,
    },
    CleanupInvites {
        invites: BTreeMap<String, bool>,
    },
    ApplyFilter {
        allowed: HashSet<String>,
    },
    RemoveFilter,
    SelectRoom {
        room_id: String,
    },
    UpdateDescription {
        room_id: String,
        message: LastMessage,
    },
    PointerEnter,
    PointerLeave,
    /// Let the scheduler run for `ms` milliseconds.
    Wait {
        ms: u64,
    },
    RequestLeave {
        room_id: String,
    },
    RequestJoin {
        room_alias: String,
    },
    AcceptInvite {
        room_id: String,
    },
    DeclineInvite {
        room_id: String,
    },
}

impl ReplayStep {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::AddRoom { .. } => "add_room",
            Self::AddInvitedRoom { .. } => "add_invited_room",
            Self::UpdateRoom { .. } => "update_room",
            Self::RemoveRoom { .. } => "remove_room",
            Self::Sync { .. } => "sync",
            Self::UpdateUnreadCount { .. } => "update_unread_count",
            Self::UpdateReadStatus { .. } => "update_read_status",
            Self::CleanupInvites { .. } => "cleanup_invites",
            Self::ApplyFilter { .. } => "apply_filter",
            Self::RemoveFilter => "remove_filter",
            Self::SelectRoom { .. } => "select_room",
            Self::UpdateDescription { .. } => "update_description",
            Self::PointerEnter => "pointer_enter",
            Self::PointerLeave => "pointer_leave",
            Self::Wait { .. } => "wait",
            Self::RequestLeave { .. } => "request_leave",
            Self::RequestJoin { .. } => "request_join",
            Self::AcceptInvite { .. } => "accept_invite",
            Self::DeclineInvite { .. } => "decline_invite",
        }
    }
}

/// Load and parse a replay script.
pub fn load_script(path: &Path) -> Result<Vec<ReplayStep>, ReplayError> {
    let bytes = fs::read(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&bytes).map_err(|source| ReplayError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_script(bytes: &[u8]) -> Result<Vec<ReplayStep>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Apply a non-`wait` step to the view. `now_ms` stamps pointer leaves.
pub fn apply_step(view: &mut RoomListView, step: ReplayStep, now_ms: u64) {
    match step {
        ReplayStep::Initialize { rooms } => view.initialize(&rooms),
        ReplayStep::AddRoom { room_id, info } => view.add_room(&room_id, &info),
        ReplayStep::AddInvitedRoom { room_id, info } => view.add_invited_room(&room_id, &info),
        ReplayStep::UpdateRoom { room_id, info } => view.update_room(&room_id, &info),
        ReplayStep::RemoveRoom {
            room_id,
            reset_selection,
        } => view.remove_room(&room_id, reset_selection),
        ReplayStep::Sync { rooms } => view.sync(&rooms),
        ReplayStep::UpdateUnreadCount { room_id, count } => {
            view.update_unread_count(&room_id, count)
        }
        ReplayStep::UpdateReadStatus { status } => view.update_read_status(&status),
        ReplayStep::CleanupInvites { invites } => {
            view.cleanup_invites(&invites);
        }
        ReplayStep::ApplyFilter { allowed } => view.apply_filter(&allowed),
        ReplayStep::RemoveFilter => view.remove_filter(),
        ReplayStep::SelectRoom { room_id } => view.select_room(&room_id),
        ReplayStep::UpdateDescription { room_id, message } => {
            view.update_room_description(&room_id, message)
        }
        ReplayStep::PointerEnter => view.pointer_entered(),
        ReplayStep::PointerLeave => view.pointer_left(now_ms),
        ReplayStep::Wait { .. } => {}
        ReplayStep::RequestLeave { room_id } => view.request_leave(&room_id),
        ReplayStep::RequestJoin { room_alias } => view.request_join(&room_alias),
        ReplayStep::AcceptInvite { room_id } => view.accept_invite(&room_id),
        ReplayStep::DeclineInvite { room_id } => view.decline_invite(&room_id),
    }
}
