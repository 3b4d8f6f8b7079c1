//! Capability interfaces over the conferencing SDK.
//!
//! The rest of the client depends only on these narrow traits. An adapter
//! over the real SDK implements them; `room-test-utils` implements them with
//! in-memory fakes.
//!
//! ```text
//! RoomConnector::connect(token, options) -> Room
//! Room
//! ├── local_participant() -> Participant (outbound data tracks)
//! ├── participants()      -> [Participant]      remote roster snapshot
//! └── subscribe()         -> EventStream<RoomEvent>
//! Participant
//! ├── publications()      -> [TrackPublication] subscribed iff track present
//! └── subscribe()         -> EventStream<ParticipantEvent>
//! ```

pub mod events;

pub use events::{EventStream, Listeners};

use async_trait::async_trait;
use common::secret::SecretString;
use common::types::{ElementId, ParticipantSid, RoomSid, TrackSid};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the SDK.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// Room connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Payload could not be sent on a data track.
    #[error("send failed: {0}")]
    Send(String),

    /// The underlying room or track is closed.
    #[error("closed")]
    Closed,
}

/// Kind of a published track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

/// How a rendered element is laid out inside its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementLayout {
    /// Whatever size the SDK produced.
    #[default]
    Intrinsic,

    /// 100% width and height with cover fit.
    FillCover,
}

/// A rendering node produced by attaching a media track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaElement {
    pub id: ElementId,
    pub track_sid: TrackSid,
    pub kind: TrackKind,
    pub layout: ElementLayout,
}

impl MediaElement {
    /// Create an element with intrinsic layout.
    #[must_use]
    pub fn new(track_sid: TrackSid, kind: TrackKind) -> Self {
        Self {
            id: ElementId::new(),
            track_sid,
            kind,
            layout: ElementLayout::Intrinsic,
        }
    }

    /// Size the element to fill its container.
    #[must_use]
    pub fn fill_container(mut self) -> Self {
        self.layout = ElementLayout::FillCover;
        self
    }
}

/// An audio or video track that can be bound to rendering elements.
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn sid(&self) -> &TrackSid;

    fn kind(&self) -> TrackKind;

    /// Bind the track to a new element.
    fn attach(&self) -> MediaElement;

    /// Unbind the track from one element it was attached to.
    fn detach(&self, element: &ElementId);
}

/// A bidirectional data track carrying text payloads.
pub trait DataTrack: Send + Sync + fmt::Debug {
    fn sid(&self) -> &TrackSid;

    /// Send a payload (outbound tracks only).
    fn send(&self, payload: &str) -> Result<(), SdkError>;

    /// Listen for inbound payloads.
    fn messages(&self) -> EventStream<String>;
}

/// A subscribed track.
#[derive(Debug, Clone)]
pub enum TrackHandle {
    Media(Arc<dyn MediaTrack>),
    Data(Arc<dyn DataTrack>),
}

impl TrackHandle {
    #[must_use]
    pub fn sid(&self) -> &TrackSid {
        match self {
            TrackHandle::Media(track) => track.sid(),
            TrackHandle::Data(track) => track.sid(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackHandle::Media(track) => track.kind(),
            TrackHandle::Data(_) => TrackKind::Data,
        }
    }
}

/// A track capability exposed by a participant.
#[derive(Debug, Clone)]
pub struct TrackPublication {
    pub track_sid: TrackSid,
    pub kind: TrackKind,
    /// Present once the local client is subscribed.
    pub track: Option<TrackHandle>,
}

impl TrackPublication {
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.track.is_some()
    }
}

/// Subscription transitions of one participant's publications.
#[derive(Debug, Clone)]
pub enum ParticipantEvent {
    TrackSubscribed(TrackHandle),
    TrackUnsubscribed(TrackHandle),
}

/// One connected endpoint, local or remote.
pub trait Participant: Send + Sync + fmt::Debug {
    fn sid(&self) -> &ParticipantSid;

    fn identity(&self) -> &str;

    /// Snapshot of current publications.
    fn publications(&self) -> Vec<TrackPublication>;

    /// Register a listener for subscription transitions.
    fn subscribe(&self) -> EventStream<ParticipantEvent>;

    /// Outbound data tracks published by this participant (local only).
    fn outbound_data_tracks(&self) -> Vec<Arc<dyn DataTrack>> {
        Vec::new()
    }
}

/// Roster and connection notifications of a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ParticipantConnected(Arc<dyn Participant>),
    ParticipantDisconnected(Arc<dyn Participant>),
    /// The connection was lost or closed by the server.
    Disconnected { reason: String },
}

/// A live room connection.
pub trait Room: Send + Sync + fmt::Debug {
    fn sid(&self) -> &RoomSid;

    fn local_participant(&self) -> Arc<dyn Participant>;

    /// Remote participants already present.
    fn participants(&self) -> Vec<Arc<dyn Participant>>;

    /// Register a listener for roster and connection notifications.
    fn subscribe(&self) -> EventStream<RoomEvent>;

    /// Tear the connection down. Disconnecting twice is a no-op.
    fn disconnect(&self);
}

/// Bounded capture resolution for the local camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
}

/// Capture configuration handed to the SDK at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
    /// Publish a local outbound data track for chat.
    pub data_track: bool,
}

impl ConnectOptions {
    /// Audio on, video bounded to `width`.
    #[must_use]
    pub fn new(video_width: u32, data_track: bool) -> Self {
        Self {
            audio: true,
            video: Some(VideoConstraints { width: video_width }),
            data_track,
        }
    }
}

/// Establishes room connections.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(
        &self,
        token: &SecretString,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn Room>, SdkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_container_sets_cover_layout() {
        let element = MediaElement::new(TrackSid::from("MT1"), TrackKind::Video);
        assert_eq!(element.layout, ElementLayout::Intrinsic);

        let element = element.fill_container();
        assert_eq!(element.layout, ElementLayout::FillCover);
    }

    #[test]
    fn test_connect_options_capture_defaults() {
        let options = ConnectOptions::new(640, true);
        assert!(options.audio);
        assert_eq!(options.video, Some(VideoConstraints { width: 640 }));
        assert!(options.data_track);
    }

    #[test]
    fn test_unsubscribed_publication() {
        let publication = TrackPublication {
            track_sid: TrackSid::from("MT2"),
            kind: TrackKind::Audio,
            track: None,
        };
        assert!(!publication.is_subscribed());
    }
}
