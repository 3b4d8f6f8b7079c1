//! Session bookkeeping owned by the Room Session actor.
//!
//! - `roster` - reducer over participant connect/disconnect events
//! - `pin` - main view selection
//! - `state` - observable snapshots

pub mod pin;
pub mod roster;
pub mod state;

pub use pin::{MainView, PinSelection};
pub use roster::{Roster, RosterEvent};
pub use state::{ConnectionState, ParticipantSummary, SessionInfo, SessionState};
