//! `ChatChannel` - text chat over the room's data tracks.
//!
//! The channel owns the client-local chat log. The room it sends on and reads
//! from is attached on connect and detached on leave. Each attach starts an
//! empty log; a detached log stays readable until the next attach.
//!
//! # Receipt
//!
//! While a room is attached, one watcher task per remote participant (present
//! at attach time or connecting later) starts one reader per subscribed data
//! track. A track is read at most once; an unsubscribed track's reader stops.
//! Readers forward raw payloads to the actor over a queue owned by the
//! attachment, which decodes and appends them in receipt order. Payloads still
//! queued when the room is detached or replaced are discarded.
//!
//! # Delivery
//!
//! Outbound payloads go on the local participant's first outbound data track.
//! Whether the sender sees its own message when delivery did not happen is
//! governed by [`EchoPolicy`].

use crate::config::EchoPolicy;
use crate::errors::ClientError;
use crate::models::{fallback_author, ChatMessage, ChatPayload, LOCAL_AUTHOR};
use crate::sdk::{
    DataTrack, EventStream, Participant, ParticipantEvent, Room, RoomEvent, TrackHandle,
};

use common::types::{ParticipantSid, TrackSid};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the chat mailbox.
const CHAT_CHANNEL_BUFFER: usize = 100;

/// Result of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the local outbound data track.
    Delivered,
    /// No room, no outbound track, or the track refused the payload.
    Undelivered,
    /// Blank text; nothing sent or logged.
    Ignored,
}

/// Messages to the chat actor.
#[derive(Debug)]
enum ChatRequest {
    Send {
        text: String,
        respond_to: oneshot::Sender<SendOutcome>,
    },
    AttachRoom {
        room: Arc<dyn Room>,
        display_name: String,
        respond_to: oneshot::Sender<()>,
    },
    DetachRoom {
        respond_to: oneshot::Sender<()>,
    },
}

/// Raw payload forwarded by a track reader.
#[derive(Debug)]
struct Inbound {
    fallback_author: String,
    payload: String,
}

/// Handle to the `ChatChannel` actor.
#[derive(Clone, Debug)]
pub struct ChatHandle {
    sender: mpsc::Sender<ChatRequest>,
    log: watch::Receiver<Vec<ChatMessage>>,
    cancel_token: CancellationToken,
}

impl ChatHandle {
    /// Send a chat message.
    pub async fn send(&self, text: impl Into<String>) -> Result<SendOutcome, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ChatRequest::Send {
                text: text.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Start sending on and reading from `room`.
    ///
    /// Participants and tracks present now are being read when this returns.
    pub async fn attach_room(
        &self,
        room: Arc<dyn Room>,
        display_name: impl Into<String>,
    ) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ChatRequest::AttachRoom {
                room,
                display_name: display_name.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Stop every reader and forget the room. The log is kept.
    pub async fn detach_room(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ChatRequest::DetachRoom { respond_to: tx })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Current log snapshot.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.log.borrow().clone()
    }

    /// Observe the log.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.log.clone()
    }

    /// Cancel the chat actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Room the channel is currently bound to.
struct AttachedRoom {
    room: Arc<dyn Room>,
    display_name: String,
    /// Payloads from this room's readers.
    inbound: mpsc::UnboundedReceiver<Inbound>,
    /// Cancels the room watcher and every reader when dropped.
    _guard: DropGuard,
}

/// The `ChatChannel` implementation.
pub struct ChatChannel {
    receiver: mpsc::Receiver<ChatRequest>,
    log: watch::Sender<Vec<ChatMessage>>,
    echo: EchoPolicy,
    attached: Option<AttachedRoom>,
    cancel_token: CancellationToken,
}

impl ChatChannel {
    /// Spawn a new chat actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(echo: EchoPolicy, cancel_token: CancellationToken) -> (ChatHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CHAT_CHANNEL_BUFFER);
        let (log, log_rx) = watch::channel(Vec::new());

        let actor = Self {
            receiver,
            log,
            echo,
            attached: None,
            cancel_token: cancel_token.clone(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ChatHandle {
            sender,
            log: log_rx,
            cancel_token,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "room.chat", fields(echo = ?self.echo))]
    async fn run(mut self) {
        debug!(target: "room.chat", "ChatChannel started");

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(target: "room.chat", "ChatChannel received cancellation signal");
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            debug!(target: "room.chat", "ChatChannel channel closed, exiting");
                            break;
                        }
                    }
                }

                Some(inbound) = next_inbound(&mut self.attached) => {
                    let message = ChatMessage::decode(&inbound.payload, &inbound.fallback_author);
                    debug!(
                        target: "room.chat",
                        author = %message.author,
                        text_len = message.text.len(),
                        "Received chat message"
                    );
                    self.append(message);
                }
            }
        }

        self.attached = None;

        info!(
            target: "room.chat",
            messages = self.log.borrow().len(),
            "ChatChannel stopped"
        );
    }

    fn handle_message(&mut self, message: ChatRequest) {
        match message {
            ChatRequest::Send { text, respond_to } => {
                let outcome = self.handle_send(text);
                let _ = respond_to.send(outcome);
            }
            ChatRequest::AttachRoom {
                room,
                display_name,
                respond_to,
            } => {
                self.handle_attach(room, display_name);
                let _ = respond_to.send(());
            }
            ChatRequest::DetachRoom { respond_to } => {
                if self.attached.take().is_some() {
                    debug!(target: "room.chat", "Room detached");
                }
                let _ = respond_to.send(());
            }
        }
    }

    fn handle_send(&mut self, text: String) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let result = match &self.attached {
            Some(attached) => {
                let from = if attached.display_name.is_empty() {
                    LOCAL_AUTHOR
                } else {
                    attached.display_name.as_str()
                };
                publish(attached.room.as_ref(), from, &text)
            }
            None => Err(ClientError::Delivery(
                "No room connected. Chat may not be delivered.".to_string(),
            )),
        };

        let delivered = match result {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "room.chat", error = %e, "Chat message not delivered");
                false
            }
        };

        let echo = match self.echo {
            EchoPolicy::Optimistic => true,
            EchoPolicy::AfterPublish => delivered,
        };
        if echo {
            self.append(ChatMessage::new(LOCAL_AUTHOR, text));
        }

        if delivered {
            SendOutcome::Delivered
        } else {
            SendOutcome::Undelivered
        }
    }

    fn handle_attach(&mut self, room: Arc<dyn Room>, display_name: String) {
        let room_token = self.cancel_token.child_token();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        // Listen first, then snapshot
        let events = room.subscribe();
        let mut watchers = HashMap::new();
        for participant in room.participants() {
            let token = room_token.child_token();
            spawn_participant_watcher(participant.as_ref(), token.clone(), inbound_tx.clone());
            watchers.insert(participant.sid().clone(), token);
        }

        tokio::spawn(watch_room(
            events,
            watchers,
            room_token.clone(),
            inbound_tx,
        ));

        info!(
            target: "room.chat",
            room_sid = %room.sid(),
            "Room attached"
        );

        // Replacing a previous room drops its guard and its queued payloads
        self.attached = Some(AttachedRoom {
            room,
            display_name,
            inbound,
            _guard: room_token.drop_guard(),
        });
        self.log.send_replace(Vec::new());
    }

    fn append(&mut self, message: ChatMessage) {
        self.log.send_modify(|log| log.push(message));
    }
}

/// Send `text` on the first outbound data track.
fn publish(room: &dyn Room, from: &str, text: &str) -> Result<(), ClientError> {
    let tracks = room.local_participant().outbound_data_tracks();
    let Some(track) = tracks.first() else {
        return Err(ClientError::Delivery(
            "No local data track published. Chat may not be delivered.".to_string(),
        ));
    };

    let payload = ChatPayload::new(from, text)
        .encode()
        .map_err(|e| ClientError::Delivery(format!("payload encoding failed: {e}")))?;

    track.send(&payload).map_err(|e| {
        ClientError::Delivery(format!("track {} refused payload: {e}", track.sid()))
    })?;

    debug!(target: "room.chat", track_sid = %track.sid(), "Chat payload sent");
    Ok(())
}

/// Follow roster changes, keeping one participant watcher per remote participant.
async fn watch_room(
    mut events: EventStream<RoomEvent>,
    mut watchers: HashMap<ParticipantSid, CancellationToken>,
    room_token: CancellationToken,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
) {
    loop {
        tokio::select! {
            biased;

            () = room_token.cancelled() => break,

            event = events.recv() => match event {
                Some(RoomEvent::ParticipantConnected(participant)) => {
                    if let Some(previous) = watchers.remove(participant.sid()) {
                        previous.cancel();
                    }
                    let token = room_token.child_token();
                    spawn_participant_watcher(participant.as_ref(), token.clone(), inbound_tx.clone());
                    watchers.insert(participant.sid().clone(), token);
                }
                Some(RoomEvent::ParticipantDisconnected(participant)) => {
                    if let Some(token) = watchers.remove(participant.sid()) {
                        token.cancel();
                    }
                }
                Some(RoomEvent::Disconnected { .. }) | None => break,
            },
        }
    }

    for (_, token) in watchers {
        token.cancel();
    }
}

/// Listen to one participant, then start readers for its subscribed data tracks.
fn spawn_participant_watcher(
    participant: &dyn Participant,
    token: CancellationToken,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
) {
    let author = fallback_author(participant.identity()).to_string();
    let events = participant.subscribe();

    let mut readers: HashMap<TrackSid, CancellationToken> = HashMap::new();
    for publication in participant.publications() {
        if let Some(TrackHandle::Data(track)) = publication.track {
            start_reader(&mut readers, track, &token, &author, &inbound_tx);
        }
    }

    tokio::spawn(watch_participant(events, readers, token, author, inbound_tx));
}

async fn watch_participant(
    mut events: EventStream<ParticipantEvent>,
    mut readers: HashMap<TrackSid, CancellationToken>,
    token: CancellationToken,
    author: String,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
) {
    loop {
        tokio::select! {
            biased;

            () = token.cancelled() => break,

            event = events.recv() => match event {
                Some(ParticipantEvent::TrackSubscribed(TrackHandle::Data(track))) => {
                    start_reader(&mut readers, track, &token, &author, &inbound_tx);
                }
                Some(ParticipantEvent::TrackUnsubscribed(TrackHandle::Data(track))) => {
                    if let Some(reader) = readers.remove(track.sid()) {
                        reader.cancel();
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    for (_, reader) in readers {
        reader.cancel();
    }
}

fn start_reader(
    readers: &mut HashMap<TrackSid, CancellationToken>,
    track: Arc<dyn DataTrack>,
    parent: &CancellationToken,
    author: &str,
    inbound_tx: &mpsc::UnboundedSender<Inbound>,
) {
    if readers.contains_key(track.sid()) {
        return;
    }

    let token = parent.child_token();
    let messages = track.messages();
    debug!(target: "room.chat", track_sid = %track.sid(), author = %author, "Reading data track");

    tokio::spawn(read_track(
        messages,
        token.clone(),
        author.to_string(),
        inbound_tx.clone(),
    ));
    readers.insert(track.sid().clone(), token);
}

async fn read_track(
    mut messages: EventStream<String>,
    token: CancellationToken,
    author: String,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
) {
    loop {
        tokio::select! {
            biased;

            () = token.cancelled() => break,

            payload = messages.recv() => match payload {
                Some(payload) => {
                    let inbound = Inbound {
                        fallback_author: author.clone(),
                        payload,
                    };
                    if inbound_tx.send(inbound).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

async fn next_inbound(attached: &mut Option<AttachedRoom>) -> Option<Inbound> {
    match attached {
        Some(attached) => attached.inbound.recv().await,
        None => std::future::pending().await,
    }
}
