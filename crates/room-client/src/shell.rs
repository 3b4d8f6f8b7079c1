//! App Shell - the join form in front of the Room Session.
//!
//! The shell collects a display name and a room name, validates both, and
//! mounts exactly one Room Session for the rest of its lifetime. There is no
//! re-join flow: once mounted, further submits are refused.

use crate::actors::session::{RoomSession, RoomSessionHandle};
use crate::config::Config;
use crate::errors::{ClientError, ValidationError};
use crate::sdk::RoomConnector;
use crate::services::BackendApi;
use crate::ui::Canvas;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// The mounted session and its task.
struct Mounted {
    handle: RoomSessionHandle,
    task: JoinHandle<()>,
}

/// Application entry point for one user.
pub struct AppShell {
    config: Config,
    backend: Arc<dyn BackendApi>,
    connector: Arc<dyn RoomConnector>,
    canvas: Arc<dyn Canvas>,
    cancel_token: CancellationToken,
    mounted: Option<Mounted>,
}

impl AppShell {
    #[must_use]
    pub fn new(
        config: Config,
        backend: Arc<dyn BackendApi>,
        connector: Arc<dyn RoomConnector>,
        canvas: Arc<dyn Canvas>,
    ) -> Self {
        Self {
            config,
            backend,
            connector,
            canvas,
            cancel_token: CancellationToken::new(),
            mounted: None,
        }
    }

    /// Validate the form and mount the Room Session.
    ///
    /// Joining proceeds in the background; its outcome shows up in the
    /// session state.
    ///
    /// # Errors
    ///
    /// - `Validation` if either field is blank (nothing is mounted)
    /// - `AlreadyJoined` if a session was mounted before
    #[instrument(skip_all, name = "room.shell")]
    pub async fn submit(
        &mut self,
        display_name: &str,
        room_name: &str,
    ) -> Result<RoomSessionHandle, ClientError> {
        let display_name = display_name.trim();
        let room_name = room_name.trim();

        if display_name.is_empty() || room_name.is_empty() {
            warn!(target: "room.shell", "Join form incomplete");
            return Err(ValidationError::MissingFields.into());
        }

        if self.mounted.is_some() {
            return Err(ClientError::AlreadyJoined);
        }

        info!(
            target: "room.shell",
            display_name = %display_name,
            room = %room_name,
            "Mounting room session"
        );

        let (handle, task) = RoomSession::spawn(
            self.config.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.connector),
            Arc::clone(&self.canvas),
            self.cancel_token.child_token(),
        );
        handle.begin_join(display_name, room_name).await?;

        self.mounted = Some(Mounted {
            handle: handle.clone(),
            task,
        });

        Ok(handle)
    }

    /// The mounted session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&RoomSessionHandle> {
        self.mounted.as_ref().map(|mounted| &mounted.handle)
    }

    /// Unmount the session and wait for its teardown.
    pub async fn shutdown(&mut self) {
        self.cancel_token.cancel();

        if let Some(mounted) = self.mounted.take() {
            if let Err(e) = mounted.task.await {
                warn!(target: "room.shell", error = %e, "Room session task ended abnormally");
            }
            info!(
                target: "room.shell",
                shut_down = mounted.handle.is_shut_down(),
                "Room session unmounted"
            );
        }
    }
}
