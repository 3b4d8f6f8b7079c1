//! Observable session state.
//!
//! The Room Session actor publishes a fresh [`SessionState`] snapshot on a
//! `watch` channel after every mutation. The rendering layer and callers read
//! snapshots only; they never hold the actor's internals.

use crate::models::DownloadInfo;
use crate::session::pin::{MainView, PinSelection};

use common::types::{ParticipantSid, RoomSid};

/// Connection lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Roster entry as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub sid: ParticipantSid,
    pub identity: String,
}

/// Returned by a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub room_sid: RoomSid,
    pub local_identity: String,
    pub participants: Vec<ParticipantSummary>,
}

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub status: ConnectionState,
    pub display_name: Option<String>,
    pub room_name: Option<String>,
    pub room_sid: Option<RoomSid>,
    pub local_identity: Option<String>,
    /// Remote participants in arrival order.
    pub participants: Vec<ParticipantSummary>,
    pub pin: PinSelection,
    pub main_view: MainView,
    pub download: Option<DownloadInfo>,
    /// Absolute link to the recording once ready.
    pub download_url: Option<String>,
    /// User-facing text of the last credential or connection failure.
    pub last_error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionState::Connected
    }

    /// Whether a join is pending or a session is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != ConnectionState::Disconnected
    }

    #[must_use]
    pub fn participant_identities(&self) -> Vec<&str> {
        self.participants
            .iter()
            .map(|p| p.identity.as_str())
            .collect()
    }
}
