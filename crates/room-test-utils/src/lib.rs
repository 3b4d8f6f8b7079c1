//! # Room Test Utilities
//!
//! Shared test utilities for the room client.
//!
//! This crate provides in-memory fakes for every SDK capability the client
//! depends on, so sessions, views and chat can be exercised without a real
//! conferencing service.
//!
//! ## Modules
//!
//! - `sdk` - Fake room, participants, tracks and connector
//! - `canvas` - Fake canvas and surfaces
//! - `eventual` - Polling assertions for actor-driven effects
//! - `logging` - Test subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     init_tracing();
//!
//!     let room = FakeRoom::new("RM1", "alice");
//!     let connector = Arc::new(FakeConnector::new(room.clone()));
//!     let canvas = FakeCanvas::new();
//!
//!     // Spawn a RoomSession with the fakes, then drive the room...
//!     room.connect_participant(FakeParticipant::new("PA2", "bob"));
//! }
//! ```

pub mod canvas;
pub mod eventual;
pub mod logging;
pub mod sdk;

// Re-export commonly used items
pub use canvas::*;
pub use eventual::*;
pub use logging::init_tracing;
pub use sdk::*;
