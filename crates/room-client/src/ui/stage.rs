//! Stage - keeps mounted participant views in line with session state.
//!
//! Desired layout for a live session:
//! - `Thumbnail(Local)` renders the local participant
//! - `Thumbnail(Remote(sid))` renders each roster entry
//! - `Main` renders whatever the pin resolves to, or nothing
//!
//! A slot whose participant handle changed is unmounted before the new view
//! mounts, so one surface never holds elements from two views. When the
//! session goes away every view is unmounted.

use crate::actors::participant_view::{ParticipantView, ParticipantViewHandle, ViewRole};
use crate::sdk::Participant;
use crate::session::{MainView, Roster};
use crate::ui::{Canvas, Slot, TileKey};

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A view mounted in one slot.
#[derive(Debug)]
struct MountedView {
    participant: Arc<dyn Participant>,
    role: ViewRole,
    handle: ParticipantViewHandle,
}

/// Mounted views keyed by slot.
#[derive(Debug)]
pub struct Stage {
    canvas: Arc<dyn Canvas>,
    mounted: HashMap<Slot, MountedView>,
    cancel_token: CancellationToken,
}

impl Stage {
    /// Views mount on child tokens of `cancel_token`.
    #[must_use]
    pub fn new(canvas: Arc<dyn Canvas>, cancel_token: CancellationToken) -> Self {
        Self {
            canvas,
            mounted: HashMap::new(),
            cancel_token,
        }
    }

    /// Reconcile against a live session.
    pub async fn sync(
        &mut self,
        local: &Arc<dyn Participant>,
        roster: &Roster,
        main_view: &MainView,
    ) {
        let mut desired: Vec<(Slot, Arc<dyn Participant>, ViewRole)> =
            Vec::with_capacity(roster.len() + 2);

        desired.push((
            Slot::Thumbnail(TileKey::Local),
            Arc::clone(local),
            ViewRole::Local,
        ));
        for participant in roster.iter() {
            desired.push((
                Slot::Thumbnail(TileKey::Remote(participant.sid().clone())),
                Arc::clone(participant),
                ViewRole::Remote,
            ));
        }
        match main_view {
            MainView::Local => desired.push((Slot::Main, Arc::clone(local), ViewRole::Local)),
            MainView::Remote(sid) => {
                if let Some(participant) = roster.find_by_sid(sid) {
                    desired.push((Slot::Main, Arc::clone(participant), ViewRole::Remote));
                }
            }
            MainView::Empty => {}
        }

        // Unmount stale slots
        let stale: Vec<Slot> = self
            .mounted
            .iter()
            .filter(|(slot, view)| {
                !desired.iter().any(|(s, p, role)| {
                    s == *slot && *role == view.role && Arc::ptr_eq(p, &view.participant)
                })
            })
            .map(|(slot, _)| slot.clone())
            .collect();

        for slot in stale {
            if let Some(view) = self.mounted.remove(&slot) {
                debug!(target: "room.stage", slot = ?slot, "Unmounting view");
                view.handle.unmount().await;
            }
        }

        // Mount missing slots
        for (slot, participant, role) in desired {
            if self.mounted.contains_key(&slot) {
                continue;
            }
            debug!(
                target: "room.stage",
                slot = ?slot,
                identity = %participant.identity(),
                "Mounting view"
            );
            let surface = self.canvas.surface(&slot);
            let handle = ParticipantView::mount(
                Arc::clone(&participant),
                surface,
                role,
                self.cancel_token.child_token(),
            );
            self.mounted.insert(
                slot,
                MountedView {
                    participant,
                    role,
                    handle,
                },
            );
        }
    }

    /// Unmount every view.
    pub async fn clear(&mut self) {
        if self.mounted.is_empty() {
            return;
        }
        debug!(target: "room.stage", views = self.mounted.len(), "Clearing stage");
        for (_, view) in self.mounted.drain() {
            view.handle.unmount().await;
        }
    }
}
