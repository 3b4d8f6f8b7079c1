//! `RoomSession` - owns the connection lifecycle to one conferencing room.
//!
//! The session actor:
//! - Acquires a room token from the backend, then connects through the SDK
//! - Tracks the remote roster from room notifications, in emission order
//! - Polls recording status while connected
//! - Binds the Chat Channel to the live room
//! - Keeps the stage in line with its state after every mutation
//!
//! # Mount guard
//!
//! Every join carries a generation number. The token request and connect
//! call run on a separate task and report back with their generation. A
//! result whose generation is no longer pending (the caller left or the
//! session shut down meanwhile) never touches state; a room it carries is
//! disconnected on the spot.
//!
//! # Scoped tasks
//!
//! The recording poller runs on a token owned by the live connection record.
//! Dropping the record (leave, connection loss, shutdown, actor exit) cancels
//! it, so no poll request is issued for a torn-down session.

use crate::actors::chat::{ChatChannel, ChatHandle, SendOutcome};
use crate::config::Config;
use crate::errors::{ClientError, ValidationError};
use crate::models::DownloadInfo;
use crate::sdk::{ConnectOptions, EventStream, Participant, Room, RoomConnector, RoomEvent};
use crate::services::BackendApi;
use crate::session::{
    ConnectionState, MainView, PinSelection, Roster, RosterEvent, SessionInfo, SessionState,
};
use crate::tasks::poll_recording_until_ready;
use crate::ui::{Canvas, Stage};

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 100;

/// Shown when the SDK reports the room connection gone.
const CONNECTION_LOST_MESSAGE: &str = "Connection to the room was lost";

type JoinReply = oneshot::Sender<Result<SessionInfo, ClientError>>;

/// Requests to the session actor.
#[derive(Debug)]
enum SessionMessage {
    Join {
        display_name: String,
        room_name: String,
        /// Absent for fire-and-forget joins.
        respond_to: Option<JoinReply>,
    },
    Leave {
        respond_to: oneshot::Sender<()>,
    },
    Pin {
        selection: PinSelection,
        respond_to: oneshot::Sender<()>,
    },
}

/// Results reported back by tasks the actor spawned.
#[derive(Debug)]
enum TaskEvent {
    JoinCompleted {
        generation: u64,
        result: Result<Arc<dyn Room>, ClientError>,
    },
    RecordingReady {
        generation: u64,
        info: DownloadInfo,
    },
}

/// Handle to the `RoomSession` actor.
#[derive(Clone, Debug)]
pub struct RoomSessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    state: watch::Receiver<SessionState>,
    chat: ChatHandle,
    cancel_token: CancellationToken,
}

impl RoomSessionHandle {
    /// Join a room and wait for the outcome.
    ///
    /// # Errors
    ///
    /// - `Validation` if either name is blank
    /// - `AlreadyJoined` while connecting or connected
    /// - `Credential` / `Connection` if the token request or connect failed
    /// - `JoinCancelled` if the session left or shut down first
    pub async fn join(
        &self,
        display_name: impl Into<String>,
        room_name: impl Into<String>,
    ) -> Result<SessionInfo, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Join {
                display_name: display_name.into(),
                room_name: room_name.into(),
                respond_to: Some(tx),
            })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))?
    }

    /// Start joining without waiting; the outcome shows up in state.
    pub async fn begin_join(
        &self,
        display_name: impl Into<String>,
        room_name: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.sender
            .send(SessionMessage::Join {
                display_name: display_name.into(),
                room_name: room_name.into(),
                respond_to: None,
            })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))
    }

    /// Leave the room. Leaving with no session is a no-op.
    pub async fn leave(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Leave { respond_to: tx })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Choose who occupies the main view.
    pub async fn pin(&self, selection: PinSelection) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Pin {
                selection,
                respond_to: tx,
            })
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Send a chat message on the session's room.
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<SendOutcome, ClientError> {
        self.chat.send(text).await
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    #[must_use]
    pub fn chat(&self) -> &ChatHandle {
        &self.chat
    }

    /// Unmount the session: cancels a pending join and tears down the room.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A join waiting for its token request and connect call.
struct PendingJoin {
    generation: u64,
    display_name: String,
    respond_to: Option<JoinReply>,
}

/// The live room connection.
struct ActiveConnection {
    generation: u64,
    room: Arc<dyn Room>,
    local: Arc<dyn Participant>,
    roster: Roster,
    /// The session's own listener on the room.
    events: EventStream<RoomEvent>,
    /// Cancels the recording poller when dropped.
    poller_guard: DropGuard,
}

/// The `RoomSession` implementation.
pub struct RoomSession {
    config: Config,
    backend: Arc<dyn BackendApi>,
    connector: Arc<dyn RoomConnector>,
    receiver: mpsc::Receiver<SessionMessage>,
    task_tx: mpsc::UnboundedSender<TaskEvent>,
    task_rx: mpsc::UnboundedReceiver<TaskEvent>,
    state: watch::Sender<SessionState>,
    chat: ChatHandle,
    stage: Stage,
    generation: u64,
    pending: Option<PendingJoin>,
    active: Option<ActiveConnection>,
    cancel_token: CancellationToken,
}

impl RoomSession {
    /// Spawn a new session actor together with its Chat Channel.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: Config,
        backend: Arc<dyn BackendApi>,
        connector: Arc<dyn RoomConnector>,
        canvas: Arc<dyn Canvas>,
        cancel_token: CancellationToken,
    ) -> (RoomSessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(SessionState::default());
        let (chat, _chat_task) = ChatChannel::spawn(config.chat_echo, cancel_token.child_token());
        let stage = Stage::new(canvas, cancel_token.child_token());

        let actor = Self {
            config,
            backend,
            connector,
            receiver,
            task_tx,
            task_rx,
            state,
            chat: chat.clone(),
            stage,
            generation: 0,
            pending: None,
            active: None,
            cancel_token: cancel_token.clone(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomSessionHandle {
            sender,
            state: state_rx,
            chat,
            cancel_token,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "room.session")]
    async fn run(mut self) {
        debug!(target: "room.session", "RoomSession started");

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(target: "room.session", "RoomSession received cancellation signal");
                    break;
                }

                Some(event) = self.task_rx.recv() => {
                    self.handle_task_event(event).await;
                }

                event = next_room_event(&mut self.active) => {
                    self.handle_room_event(event).await;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(target: "room.session", "RoomSession channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        self.unmount().await;

        info!(target: "room.session", joins = self.generation, "RoomSession stopped");
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Join {
                display_name,
                room_name,
                respond_to,
            } => self.handle_join(display_name, room_name, respond_to),

            SessionMessage::Leave { respond_to } => {
                self.handle_leave().await;
                let _ = respond_to.send(());
            }

            SessionMessage::Pin {
                selection,
                respond_to,
            } => {
                self.handle_pin(selection).await;
                let _ = respond_to.send(());
            }
        }
    }

    // ========================================================================
    // Join
    // ========================================================================

    fn handle_join(
        &mut self,
        display_name: String,
        room_name: String,
        respond_to: Option<JoinReply>,
    ) {
        let display_name = display_name.trim().to_string();
        let room_name = room_name.trim().to_string();

        if display_name.is_empty() || room_name.is_empty() {
            reply(respond_to, Err(ValidationError::MissingFields.into()));
            return;
        }

        if self.pending.is_some() || self.active.is_some() {
            reply(respond_to, Err(ClientError::AlreadyJoined));
            return;
        }

        self.generation += 1;
        let generation = self.generation;

        info!(
            target: "room.session",
            generation,
            display_name = %display_name,
            room = %room_name,
            "Joining room"
        );

        self.state.send_modify(|state| {
            *state = SessionState {
                status: ConnectionState::Connecting,
                display_name: Some(display_name.clone()),
                room_name: Some(room_name.clone()),
                ..SessionState::default()
            };
        });

        let options = ConnectOptions::new(self.config.video_width, self.config.publish_data_track);
        tokio::spawn(run_join(
            Arc::clone(&self.backend),
            Arc::clone(&self.connector),
            options,
            display_name.clone(),
            room_name,
            generation,
            self.task_tx.clone(),
        ));

        self.pending = Some(PendingJoin {
            generation,
            display_name,
            respond_to,
        });
    }

    async fn handle_task_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::JoinCompleted { generation, result } => {
                self.handle_join_completed(generation, result).await;
            }
            TaskEvent::RecordingReady { generation, info } => {
                if generation != self.generation {
                    debug!(target: "room.session", generation, "Discarding stale recording status");
                    return;
                }
                info!(target: "room.session", url = %info.url, "Recording ready for download");
                let download_url = info.download_url(&self.config.api_base_url);
                self.state.send_modify(|state| {
                    state.download = Some(info);
                    state.download_url = download_url;
                });
            }
        }
    }

    async fn handle_join_completed(
        &mut self,
        generation: u64,
        result: Result<Arc<dyn Room>, ClientError>,
    ) {
        let pending = match self.pending.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.pending = other;
                debug!(target: "room.session", generation, "Discarding stale join result");
                if let Ok(room) = result {
                    room.disconnect();
                }
                return;
            }
        };

        match result {
            Ok(room) => {
                let info = self.connect(generation, room, &pending.display_name).await;
                reply(pending.respond_to, Ok(info));
            }
            Err(e) => {
                error!(target: "room.session", error = %e, "Failed to join room");
                let message = e.user_message();
                self.state.send_modify(|state| {
                    state.status = ConnectionState::Disconnected;
                    state.last_error = Some(message);
                });
                reply(pending.respond_to, Err(e));
            }
        }
    }

    async fn connect(
        &mut self,
        generation: u64,
        room: Arc<dyn Room>,
        display_name: &str,
    ) -> SessionInfo {
        // Listen first, then snapshot
        let events = room.subscribe();
        let roster = Roster::from_participants(room.participants());
        let local = room.local_participant();

        let connection_token = self.cancel_token.child_token();
        let poller_token = connection_token.child_token();
        let backend = Arc::clone(&self.backend);
        let room_sid = room.sid().clone();
        let interval = self.config.recording_poll_interval;
        let task_tx = self.task_tx.clone();
        tokio::spawn(async move {
            if let Some(info) =
                poll_recording_until_ready(backend, room_sid, interval, poller_token).await
            {
                let _ = task_tx.send(TaskEvent::RecordingReady { generation, info });
            }
        });

        if let Err(e) = self.chat.attach_room(Arc::clone(&room), display_name).await {
            warn!(target: "room.session", error = %e, "Chat channel unavailable");
        }

        let info = SessionInfo {
            room_sid: room.sid().clone(),
            local_identity: local.identity().to_string(),
            participants: roster.summaries(),
        };

        info!(
            target: "room.session",
            room_sid = %info.room_sid,
            participants = roster.len(),
            "Connected to room"
        );

        self.active = Some(ActiveConnection {
            generation,
            room,
            local,
            roster,
            events,
            poller_guard: connection_token.drop_guard(),
        });

        let room_sid = info.room_sid.clone();
        let local_identity = info.local_identity.clone();
        self.render(|state| {
            state.status = ConnectionState::Connected;
            state.room_sid = Some(room_sid);
            state.local_identity = Some(local_identity);
            state.pin = PinSelection::Local;
            state.last_error = None;
        })
        .await;

        info
    }

    // ========================================================================
    // Room Events
    // ========================================================================

    async fn handle_room_event(&mut self, event: Option<RoomEvent>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let event = match event {
            Some(RoomEvent::Disconnected { reason }) => {
                warn!(
                    target: "room.session",
                    generation = active.generation,
                    reason = %reason,
                    "Room connection lost"
                );
                None
            }
            None => {
                warn!(
                    target: "room.session",
                    generation = active.generation,
                    "Room event stream ended"
                );
                None
            }
            Some(event) => RosterEvent::from_room_event(&event),
        };

        let Some(event) = event else {
            self.teardown(Some(CONNECTION_LOST_MESSAGE.to_string())).await;
            return;
        };

        debug!(target: "room.session", event = ?event, "Roster event");
        if active.roster.apply(event) {
            self.render(|_| {}).await;
        }
    }

    // ========================================================================
    // Leave, Pin and Teardown
    // ========================================================================

    async fn handle_leave(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!(
                target: "room.session",
                generation = pending.generation,
                "Leaving before join completed"
            );
            reply(pending.respond_to, Err(ClientError::JoinCancelled));
            self.state.send_modify(|state| state.status = ConnectionState::Disconnected);
            return;
        }

        if self.active.is_some() {
            info!(target: "room.session", "Leaving room");
            self.teardown(None).await;
        }
    }

    async fn handle_pin(&mut self, selection: PinSelection) {
        debug!(target: "room.session", pin = ?selection, "Pin changed");
        self.render(|state| state.pin = selection).await;
    }

    /// Disconnect the live room and clear session state. Download info stays.
    async fn teardown(&mut self, last_error: Option<String>) {
        let Some(active) = self.active.take() else {
            return;
        };

        // Listener before room, so no event lands on a dropped connection
        drop(active.events);
        active.room.disconnect();
        drop(active.poller_guard);

        if let Err(e) = self.chat.detach_room().await {
            debug!(target: "room.session", error = %e, "Chat channel already gone");
        }

        self.render(|state| {
            state.status = ConnectionState::Disconnected;
            state.room_sid = None;
            state.local_identity = None;
            if last_error.is_some() {
                state.last_error = last_error;
            }
        })
        .await;

        info!(
            target: "room.session",
            generation = active.generation,
            "Room session torn down"
        );
    }

    async fn unmount(&mut self) {
        if let Some(pending) = self.pending.take() {
            reply(pending.respond_to, Err(ClientError::JoinCancelled));
        }
        self.teardown(None).await;
        self.stage.clear().await;
        self.chat.cancel();
        self.state.send_modify(|state| state.status = ConnectionState::Disconnected);
    }

    /// Apply `update`, bring the stage in line, then publish the new state.
    ///
    /// The stage settles before observers see the state it reflects.
    async fn render(&mut self, update: impl FnOnce(&mut SessionState)) {
        let mut next = self.state.borrow().clone();
        update(&mut next);

        match &self.active {
            Some(active) => {
                next.main_view = MainView::resolve(&next.pin, true, &active.roster);
                next.participants = active.roster.summaries();
                self.stage
                    .sync(&active.local, &active.roster, &next.main_view)
                    .await;
            }
            None => {
                next.main_view = MainView::Empty;
                next.participants.clear();
                self.stage.clear().await;
            }
        }

        self.state.send_replace(next);
    }
}

fn reply(respond_to: Option<JoinReply>, result: Result<SessionInfo, ClientError>) {
    if let Some(respond_to) = respond_to {
        let _ = respond_to.send(result);
    }
}

/// Request a token, then connect. Reports back to the actor with `generation`.
async fn run_join(
    backend: Arc<dyn BackendApi>,
    connector: Arc<dyn RoomConnector>,
    options: ConnectOptions,
    display_name: String,
    room_name: String,
    generation: u64,
    task_tx: mpsc::UnboundedSender<TaskEvent>,
) {
    let result: Result<Arc<dyn Room>, ClientError> = async {
        let token = backend.request_token(&display_name, &room_name).await?;
        connector
            .connect(&token, &options)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }
    .await;

    // Actor gone: nobody will disconnect this room but us
    if let Err(mpsc::error::SendError(TaskEvent::JoinCompleted {
        result: Ok(room), ..
    })) = task_tx.send(TaskEvent::JoinCompleted { generation, result })
    {
        room.disconnect();
    }
}

async fn next_room_event(active: &mut Option<ActiveConnection>) -> Option<RoomEvent> {
    match active {
        Some(active) => active.events.recv().await,
        None => std::future::pending().await,
    }
}
