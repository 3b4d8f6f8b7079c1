//! In-memory fakes for the conferencing SDK capabilities.
//!
//! Every fake records what the client did to it and exposes driver methods
//! (`connect_participant`, `subscribe_track`, `deliver`, ...) that emit the
//! same notifications the real SDK would.
//!
//! # Example
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! let room = FakeRoom::new("RM1", "alice");
//! let bob = FakeParticipant::new("PA2", "bob");
//! bob.add_subscribed(FakeMediaTrack::video("MT1").handle());
//! room.connect_participant(bob.clone());
//! ```

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::{ElementId, ParticipantSid, RoomSid, TrackSid};
use room_client::sdk::{
    ConnectOptions, DataTrack, EventStream, Listeners, MediaElement, MediaTrack, Participant,
    ParticipantEvent, Room, RoomConnector, RoomEvent, SdkError, TrackHandle, TrackKind,
    TrackPublication,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Tracks
// ============================================================================

/// Fake audio or video track.
#[derive(Debug)]
pub struct FakeMediaTrack {
    sid: TrackSid,
    kind: TrackKind,
    live: Mutex<Vec<ElementId>>,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
}

impl FakeMediaTrack {
    pub fn new(sid: &str, kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            sid: TrackSid::from(sid),
            kind,
            live: Mutex::new(Vec::new()),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
        })
    }

    pub fn video(sid: &str) -> Arc<Self> {
        Self::new(sid, TrackKind::Video)
    }

    pub fn audio(sid: &str) -> Arc<Self> {
        Self::new(sid, TrackKind::Audio)
    }

    /// Total number of `attach` calls.
    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    /// Elements attached and not yet detached.
    pub fn live_elements(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn handle(self: &Arc<Self>) -> TrackHandle {
        TrackHandle::Media(self.clone())
    }
}

impl MediaTrack for FakeMediaTrack {
    fn sid(&self) -> &TrackSid {
        &self.sid
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn attach(&self) -> MediaElement {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        let element = MediaElement::new(self.sid.clone(), self.kind);
        self.live.lock().unwrap().push(element.id);
        element
    }

    fn detach(&self, element: &ElementId) {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().retain(|id| id != element);
    }
}

/// Fake data track. Outbound sends are recorded; inbound payloads are
/// injected with [`FakeDataTrack::deliver`].
#[derive(Debug)]
pub struct FakeDataTrack {
    sid: TrackSid,
    sent: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    listeners: Listeners<String>,
}

impl FakeDataTrack {
    pub fn new(sid: &str) -> Arc<Self> {
        Arc::new(Self {
            sid: TrackSid::from(sid),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            listeners: Listeners::new(),
        })
    }

    /// Make every subsequent `send` fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Payloads sent on this track.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Emit an inbound payload to every reader.
    pub fn deliver(&self, payload: &str) {
        self.listeners.emit(&payload.to_string());
    }

    /// Number of live readers.
    pub fn reader_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn handle(self: &Arc<Self>) -> TrackHandle {
        TrackHandle::Data(self.clone())
    }
}

impl DataTrack for FakeDataTrack {
    fn sid(&self) -> &TrackSid {
        &self.sid
    }

    fn send(&self, payload: &str) -> Result<(), SdkError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SdkError::Send("fake track refused payload".to_string()));
        }
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn messages(&self) -> EventStream<String> {
        self.listeners.subscribe()
    }
}

// ============================================================================
// Participants
// ============================================================================

/// Fake local or remote participant.
#[derive(Debug)]
pub struct FakeParticipant {
    sid: ParticipantSid,
    identity: String,
    publications: Mutex<Vec<TrackPublication>>,
    outbound: Mutex<Vec<Arc<dyn DataTrack>>>,
    listeners: Listeners<ParticipantEvent>,
}

impl FakeParticipant {
    pub fn new(sid: &str, identity: &str) -> Arc<Self> {
        Arc::new(Self {
            sid: ParticipantSid::from(sid),
            identity: identity.to_string(),
            publications: Mutex::new(Vec::new()),
            outbound: Mutex::new(Vec::new()),
            listeners: Listeners::new(),
        })
    }

    /// Add a publication that is not subscribed yet.
    pub fn publish(&self, track_sid: &str, kind: TrackKind) {
        self.publications.lock().unwrap().push(TrackPublication {
            track_sid: TrackSid::from(track_sid),
            kind,
            track: None,
        });
    }

    /// Add an already-subscribed publication without emitting anything.
    pub fn add_subscribed(&self, track: TrackHandle) {
        self.publications.lock().unwrap().push(TrackPublication {
            track_sid: track.sid().clone(),
            kind: track.kind(),
            track: Some(track),
        });
    }

    /// Mark the publication subscribed and emit `TrackSubscribed`.
    pub fn subscribe_track(&self, track: TrackHandle) {
        {
            let mut publications = self.publications.lock().unwrap();
            match publications
                .iter_mut()
                .find(|p| &p.track_sid == track.sid())
            {
                Some(publication) => publication.track = Some(track.clone()),
                None => publications.push(TrackPublication {
                    track_sid: track.sid().clone(),
                    kind: track.kind(),
                    track: Some(track.clone()),
                }),
            }
        }
        self.listeners
            .emit(&ParticipantEvent::TrackSubscribed(track));
    }

    /// Mark the publication unsubscribed and emit `TrackUnsubscribed`.
    pub fn unsubscribe_track(&self, track_sid: &str) {
        let track = {
            let mut publications = self.publications.lock().unwrap();
            publications
                .iter_mut()
                .find(|p| p.track_sid.as_str() == track_sid)
                .and_then(|p| p.track.take())
        };
        if let Some(track) = track {
            self.listeners
                .emit(&ParticipantEvent::TrackUnsubscribed(track));
        }
    }

    /// Publish an outbound data track (local participant only).
    pub fn add_outbound_data_track(&self, track: Arc<FakeDataTrack>) {
        self.outbound.lock().unwrap().push(track);
    }

    /// Number of live listeners registered by the client.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Participant for FakeParticipant {
    fn sid(&self) -> &ParticipantSid {
        &self.sid
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn publications(&self) -> Vec<TrackPublication> {
        self.publications.lock().unwrap().clone()
    }

    fn subscribe(&self) -> EventStream<ParticipantEvent> {
        self.listeners.subscribe()
    }

    fn outbound_data_tracks(&self) -> Vec<Arc<dyn DataTrack>> {
        self.outbound.lock().unwrap().clone()
    }
}

// ============================================================================
// Room
// ============================================================================

/// Fake room connection.
#[derive(Debug)]
pub struct FakeRoom {
    sid: RoomSid,
    local: Arc<FakeParticipant>,
    participants: Mutex<Vec<Arc<FakeParticipant>>>,
    listeners: Listeners<RoomEvent>,
    disconnects: AtomicUsize,
}

impl FakeRoom {
    /// Room `sid` with a local participant named `local_identity`.
    pub fn new(sid: &str, local_identity: &str) -> Arc<Self> {
        Arc::new(Self {
            sid: RoomSid::from(sid),
            local: FakeParticipant::new(&format!("{sid}-local"), local_identity),
            participants: Mutex::new(Vec::new()),
            listeners: Listeners::new(),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn local(&self) -> Arc<FakeParticipant> {
        self.local.clone()
    }

    /// Seed a participant that is already present, without emitting.
    pub fn add_existing(&self, participant: Arc<FakeParticipant>) {
        self.participants.lock().unwrap().push(participant);
    }

    /// Emit `ParticipantConnected`.
    pub fn connect_participant(&self, participant: Arc<FakeParticipant>) {
        self.participants
            .lock()
            .unwrap()
            .retain(|p| p.identity() != participant.identity());
        self.participants.lock().unwrap().push(participant.clone());
        self.listeners
            .emit(&RoomEvent::ParticipantConnected(participant));
    }

    /// Emit `ParticipantDisconnected` for the participant with `identity`.
    pub fn disconnect_participant(&self, identity: &str) {
        let removed = {
            let mut participants = self.participants.lock().unwrap();
            let position = participants.iter().position(|p| p.identity() == identity);
            position.map(|index| participants.remove(index))
        };
        if let Some(participant) = removed {
            self.listeners
                .emit(&RoomEvent::ParticipantDisconnected(participant));
        }
    }

    /// Emit `ParticipantDisconnected` for exactly `participant`, even if a
    /// reconnect already replaced it under the same identity.
    pub fn disconnect_handle(&self, participant: &Arc<FakeParticipant>) {
        self.participants
            .lock()
            .unwrap()
            .retain(|p| p.sid() != participant.sid());
        self.listeners
            .emit(&RoomEvent::ParticipantDisconnected(participant.clone()));
    }

    /// Emit `Disconnected`, as when the server drops the connection.
    pub fn drop_connection(&self, reason: &str) {
        self.listeners.emit(&RoomEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnect_calls() > 0
    }

    /// Number of live room listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Room for FakeRoom {
    fn sid(&self) -> &RoomSid {
        &self.sid
    }

    fn local_participant(&self) -> Arc<dyn Participant> {
        self.local.clone()
    }

    fn participants(&self) -> Vec<Arc<dyn Participant>> {
        self.participants
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.clone() as Arc<dyn Participant>)
            .collect()
    }

    fn subscribe(&self) -> EventStream<RoomEvent> {
        self.listeners.subscribe()
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Fake SDK connector handing out scripted rooms.
#[derive(Debug)]
pub struct FakeConnector {
    /// Rooms handed out in order; the last one repeats.
    rooms: Mutex<VecDeque<Arc<FakeRoom>>>,
    fail: AtomicBool,
    gate: Option<Arc<Notify>>,
    tokens: Mutex<Vec<String>>,
    options: Mutex<Vec<ConnectOptions>>,
}

impl FakeConnector {
    pub fn new(room: Arc<FakeRoom>) -> Self {
        Self::with_rooms(vec![room])
    }

    pub fn with_rooms(rooms: Vec<Arc<FakeRoom>>) -> Self {
        Self {
            rooms: Mutex::new(rooms.into()),
            fail: AtomicBool::new(false),
            gate: None,
            tokens: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// Connector whose every connect fails.
    pub fn failing() -> Self {
        let connector = Self::with_rooms(Vec::new());
        connector.fail.store(true, Ordering::SeqCst);
        connector
    }

    /// Hold connect calls until [`FakeConnector::release`].
    #[must_use]
    pub fn with_gate(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held connect call through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Tokens presented to `connect`, exposed for assertions.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<ConnectOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl RoomConnector for FakeConnector {
    async fn connect(
        &self,
        token: &SecretString,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn Room>, SdkError> {
        self.tokens
            .lock()
            .unwrap()
            .push(token.expose_secret().to_string());
        self.options.lock().unwrap().push(options.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(SdkError::Connect("fake connect refused".to_string()));
        }

        let mut rooms = self.rooms.lock().unwrap();
        let room = if rooms.len() > 1 {
            rooms.pop_front()
        } else {
            rooms.front().cloned()
        };
        room.map(|room| room as Arc<dyn Room>)
            .ok_or_else(|| SdkError::Connect("no fake room scripted".to_string()))
    }
}
