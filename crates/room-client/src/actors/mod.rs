//! Actor model for the room client.
//!
//! Each actor owns its state, runs on its own task with a bounded mailbox,
//! and is driven through a cloneable handle.
//!
//! ```text
//! AppShell
//! └── RoomSession (1 per shell)
//!     ├── ChatChannel (1 per session)
//!     └── Stage
//!         └── ParticipantView (1 per mounted slot)
//! ```
//!
//! Cancellation flows down the tree through child `CancellationToken`s.

pub mod chat;
pub mod participant_view;
pub mod session;

pub use chat::{ChatChannel, ChatHandle, SendOutcome};
pub use participant_view::{ParticipantView, ParticipantViewHandle, ViewRole};
pub use session::{RoomSession, RoomSessionHandle};
