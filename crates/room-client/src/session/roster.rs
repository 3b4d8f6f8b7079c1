//! Remote participant roster.
//!
//! The roster is a reducer over [`RosterEvent`]s applied in SDK emission
//! order. Entries are keyed by identity and kept in arrival order; a
//! reconnect of a known identity replaces the handle in place, so the roster
//! never holds duplicate identities. A disconnect removes only the handle it
//! names: the late disconnect of a superseded handle leaves its replacement.

use crate::sdk::{Participant, RoomEvent};
use crate::session::state::ParticipantSummary;

use common::types::ParticipantSid;
use std::sync::Arc;

/// Roster change derived from room notifications.
#[derive(Debug, Clone)]
pub enum RosterEvent {
    Connected(Arc<dyn Participant>),
    /// Removal matches the departing handle's sid.
    Disconnected(ParticipantSid),
}

impl RosterEvent {
    /// Map a room notification to a roster change, if it is one.
    #[must_use]
    pub fn from_room_event(event: &RoomEvent) -> Option<Self> {
        match event {
            RoomEvent::ParticipantConnected(participant) => {
                Some(Self::Connected(Arc::clone(participant)))
            }
            RoomEvent::ParticipantDisconnected(participant) => {
                Some(Self::Disconnected(participant.sid().clone()))
            }
            RoomEvent::Disconnected { .. } => None,
        }
    }
}

/// Ordered set of remote participants keyed by identity.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    entries: Vec<Arc<dyn Participant>>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the participants already present at connect time.
    #[must_use]
    pub fn from_participants(participants: Vec<Arc<dyn Participant>>) -> Self {
        let mut roster = Self::new();
        for participant in participants {
            roster.apply(RosterEvent::Connected(participant));
        }
        roster
    }

    /// Apply one change. Returns whether the roster changed.
    pub fn apply(&mut self, event: RosterEvent) -> bool {
        match event {
            RosterEvent::Connected(participant) => {
                match self
                    .entries
                    .iter_mut()
                    .find(|p| p.identity() == participant.identity())
                {
                    Some(existing) => *existing = participant,
                    None => self.entries.push(participant),
                }
                true
            }
            RosterEvent::Disconnected(sid) => {
                let before = self.entries.len();
                self.entries.retain(|p| *p.sid() != sid);
                self.entries.len() != before
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Participants in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Participant>> {
        self.entries.iter()
    }

    /// Identities in arrival order.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|p| p.identity().to_string())
            .collect()
    }

    #[must_use]
    pub fn find_by_sid(&self, sid: &ParticipantSid) -> Option<&Arc<dyn Participant>> {
        self.entries.iter().find(|p| p.sid() == sid)
    }

    #[must_use]
    pub fn contains_sid(&self, sid: &ParticipantSid) -> bool {
        self.find_by_sid(sid).is_some()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<ParticipantSummary> {
        self.entries
            .iter()
            .map(|p| ParticipantSummary {
                sid: p.sid().clone(),
                identity: p.identity().to_string(),
            })
            .collect()
    }
}
