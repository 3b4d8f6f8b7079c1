//! `ParticipantView` - renders one participant's media tracks into a surface.
//!
//! Each view:
//! - Registers its own listener on the participant before scanning, so no
//!   subscription transition between scan and listen is lost
//! - Attaches every subscribed media track exactly once, keyed by track sid
//! - Detaches and removes the element of a track that becomes unsubscribed
//!
//! # Unmount
//!
//! Unmounting cancels the view task, which drops its listener first (only
//! its own; other consumers of the same participant handle are unaffected),
//! then detaches every track it attached, removes their elements, and strips
//! any media left on the surface.

use crate::errors::ClientError;
use crate::sdk::{
    EventStream, MediaTrack, Participant, ParticipantEvent, TrackHandle, TrackKind,
    TrackPublication,
};
use crate::ui::Surface;

use common::types::{ElementId, ParticipantSid, TrackSid};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Mailbox buffer for view queries.
const VIEW_CHANNEL_BUFFER: usize = 16;

/// Whose tracks a view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRole {
    /// Own feed: video only, own audio is never played back.
    Local,
    /// Remote feed: audio and video.
    Remote,
}

impl ViewRole {
    fn renders(self, kind: TrackKind) -> bool {
        match (self, kind) {
            (_, TrackKind::Data) => false,
            (ViewRole::Local, TrackKind::Audio) => false,
            (_, TrackKind::Audio | TrackKind::Video) => true,
        }
    }
}

/// Messages to a view.
#[derive(Debug)]
enum ViewMessage {
    AttachedTracks {
        respond_to: oneshot::Sender<Vec<TrackSid>>,
    },
}

/// Handle to a mounted `ParticipantView`.
#[derive(Debug)]
pub struct ParticipantViewHandle {
    sender: mpsc::Sender<ViewMessage>,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
    participant_sid: ParticipantSid,
}

impl ParticipantViewHandle {
    #[must_use]
    pub fn participant_sid(&self) -> &ParticipantSid {
        &self.participant_sid
    }

    /// Sids of the tracks currently attached, sorted.
    pub async fn attached_tracks(&self) -> Result<Vec<TrackSid>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ViewMessage::AttachedTracks { respond_to: tx })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Tear the view down and wait for cleanup to finish.
    pub async fn unmount(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            warn!(
                target: "room.view",
                participant_sid = %self.participant_sid,
                error = %e,
                "ParticipantView task ended abnormally"
            );
        }
    }
}

/// One attached track and the element it renders into.
#[derive(Debug)]
struct Attached {
    track: Arc<dyn MediaTrack>,
    element: ElementId,
}

/// The `ParticipantView` implementation.
pub struct ParticipantView {
    participant: Arc<dyn Participant>,
    surface: Arc<dyn Surface>,
    role: ViewRole,
    /// This view's own listener on the participant.
    events: Option<EventStream<ParticipantEvent>>,
    receiver: mpsc::Receiver<ViewMessage>,
    cancel_token: CancellationToken,
    attached: HashMap<TrackSid, Attached>,
}

impl ParticipantView {
    /// Mount a view for `participant` into `surface`.
    ///
    /// Tracks already subscribed are attached before this returns.
    pub fn mount(
        participant: Arc<dyn Participant>,
        surface: Arc<dyn Surface>,
        role: ViewRole,
        cancel_token: CancellationToken,
    ) -> ParticipantViewHandle {
        let (sender, receiver) = mpsc::channel(VIEW_CHANNEL_BUFFER);
        let participant_sid = participant.sid().clone();

        // Listen first, then scan
        let events = participant.subscribe();

        let mut view = Self {
            participant,
            surface,
            role,
            events: Some(events),
            receiver,
            cancel_token: cancel_token.clone(),
            attached: HashMap::new(),
        };

        for publication in view.participant.publications() {
            view.attach_publication(publication);
        }

        let task = tokio::spawn(view.run());

        ParticipantViewHandle {
            sender,
            cancel_token,
            task,
            participant_sid,
        }
    }

    #[instrument(
        skip_all,
        name = "room.view",
        fields(participant_sid = %self.participant.sid(), role = ?self.role)
    )]
    async fn run(mut self) {
        debug!(
            target: "room.view",
            identity = %self.participant.identity(),
            attached = self.attached.len(),
            "ParticipantView mounted"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    break;
                }

                event = next_event(&mut self.events) => {
                    match event {
                        Some(ParticipantEvent::TrackSubscribed(track)) => self.attach(track),
                        Some(ParticipantEvent::TrackUnsubscribed(track)) => self.detach(track.sid()),
                        None => {
                            debug!(target: "room.view", "Participant event stream ended");
                            self.events = None;
                        }
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(ViewMessage::AttachedTracks { respond_to }) => {
                            let mut sids: Vec<TrackSid> = self.attached.keys().cloned().collect();
                            sids.sort();
                            let _ = respond_to.send(sids);
                        }
                        None => break,
                    }
                }
            }
        }

        self.teardown();
    }

    fn attach_publication(&mut self, publication: TrackPublication) {
        // Published but not yet subscribed: wait for the transition
        if let Some(track) = publication.track {
            self.attach(track);
        }
    }

    fn attach(&mut self, track: TrackHandle) {
        let TrackHandle::Media(track) = track else {
            return;
        };

        if !self.role.renders(track.kind()) || self.attached.contains_key(track.sid()) {
            return;
        }

        let element = track.attach().fill_container();
        let element_id = element.id;
        self.surface.append(element);

        debug!(
            target: "room.view",
            track_sid = %track.sid(),
            kind = ?track.kind(),
            "Attached track"
        );

        self.attached.insert(
            track.sid().clone(),
            Attached {
                track,
                element: element_id,
            },
        );
    }

    fn detach(&mut self, sid: &TrackSid) {
        if let Some(attached) = self.attached.remove(sid) {
            attached.track.detach(&attached.element);
            self.surface.remove(&attached.element);
            debug!(target: "room.view", track_sid = %sid, "Detached track");
        }
    }

    fn teardown(&mut self) {
        // Listener goes before any element, so no callback lands on a detached track
        if let Some(events) = self.events.take() {
            events.dispose();
        }

        for (_, attached) in self.attached.drain() {
            attached.track.detach(&attached.element);
            self.surface.remove(&attached.element);
        }

        let leftover = self.surface.clear_media();
        debug!(
            target: "room.view",
            participant_sid = %self.participant.sid(),
            leftover,
            "ParticipantView unmounted"
        );
    }
}

async fn next_event(
    events: &mut Option<EventStream<ParticipantEvent>>,
) -> Option<ParticipantEvent> {
    match events {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}
